//! Distributed loaders for the matrix and vector-distribution files
//!
//! Both file formats are whitespace-separated numbers; rank 0 reads and
//! every other rank receives its share over the communicator. The matrix
//! file is handled one processor slice at a time and the vector file in
//! batches of about n/p components, so rank 0's buffer memory stays
//! bounded by the largest per-rank share rather than the whole file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::comm::{exclusive_prefix_sum, Comm};
use crate::error::{Error, Result};
use crate::matrix::TripleMatrix;
use crate::vector::VectorDistribution;

// Tags for the three point-to-point legs of the matrix distribution
const TAG_ROWS: u32 = 0;
const TAG_COLS: u32 = 1;
const TAG_VALUES: u32 = 2;

/// Pulls whitespace-separated tokens off a file, fscanf-style: token
/// boundaries matter, line boundaries do not.
struct TokenReader {
    path: PathBuf,
    reader: BufReader<File>,
}

impl TokenReader {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
        })
    }

    fn parse_err(&self, expected: &'static str) -> Error {
        Error::Parse {
            path: self.path.clone(),
            expected,
        }
    }

    fn next_token(&mut self) -> Result<Option<String>> {
        let mut token = Vec::new();
        loop {
            let (consumed, at_eof, complete) = {
                let buf = self.reader.fill_buf().map_err(|source| Error::Io {
                    path: self.path.clone(),
                    source,
                })?;
                let mut consumed = 0;
                let mut complete = false;
                for &byte in buf {
                    consumed += 1;
                    if byte.is_ascii_whitespace() {
                        if !token.is_empty() {
                            complete = true;
                            break;
                        }
                    } else {
                        token.push(byte);
                    }
                }
                (consumed, buf.is_empty(), complete)
            };
            self.reader.consume(consumed);
            if at_eof || complete {
                break;
            }
        }
        if token.is_empty() {
            Ok(None)
        } else {
            Ok(Some(String::from_utf8_lossy(&token).into_owned()))
        }
    }

    fn next_usize(&mut self, expected: &'static str) -> Result<usize> {
        self.next_token()?
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| self.parse_err(expected))
    }

    fn next_f64(&mut self, expected: &'static str) -> Result<f64> {
        self.next_token()?
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| self.parse_err(expected))
    }
}

fn read_triples(
    tr: &mut TokenReader,
    count: usize,
) -> Result<(Vec<usize>, Vec<usize>, Vec<f64>)> {
    let mut rows = Vec::with_capacity(count);
    let mut cols = Vec::with_capacity(count);
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let i = tr.next_usize("a nonzero row index")?;
        let j = tr.next_usize("a nonzero column index")?;
        let v = tr.next_f64("a nonzero value")?;
        // File indices count from one
        rows.push(
            i.checked_sub(1)
                .ok_or_else(|| tr.parse_err("a 1-based row index"))?,
        );
        cols.push(
            j.checked_sub(1)
                .ok_or_else(|| tr.parse_err("a 1-based column index"))?,
        );
        values.push(v);
    }
    Ok((rows, cols, values))
}

/// Reads a distributed matrix file and hands each rank its nonzeros
///
/// A collective call. Rank 0 opens the file, checks the header against
/// the runtime (`m n nz p`, then p+1 `Pstart` slice boundaries), and
/// ships slice q's triples to rank q; every rank returns its local
/// [`TripleMatrix`] with global, 0-based indices in file order.
///
/// Errors are returned on the detecting rank; they are fatal and the
/// caller is expected to abort the job.
pub fn load_matrix<C: Comm>(comm: &C, path: impl AsRef<Path>) -> Result<TripleMatrix<f64>> {
    let p = comm.size();
    let s = comm.rank();

    let mut reader = None;
    let mut n = 0usize;
    let mut counts: Vec<usize> = Vec::new();
    if s == 0 {
        let mut tr = TokenReader::open(path.as_ref())?;
        let m = tr.next_usize("matrix header: row count")?;
        n = tr.next_usize("matrix header: column count")?;
        let _nz_total = tr.next_usize("matrix header: nonzero count")?;
        let pa = tr.next_usize("matrix header: processor count")?;
        if pa != p {
            return Err(Error::MatrixProcMismatch {
                declared: pa,
                runtime: p,
            });
        }
        if m != n {
            return Err(Error::NotSquare { rows: m, cols: n });
        }
        let mut pstart = Vec::with_capacity(p + 1);
        for _ in 0..=p {
            pstart.push(tr.next_usize("a Pstart entry")?);
        }
        counts = pstart
            .windows(2)
            .map(|w| {
                w[1].checked_sub(w[0])
                    .ok_or_else(|| tr.parse_err("nondecreasing Pstart entries"))
            })
            .collect::<Result<_>>()?;
        reader = Some(tr);
    }

    let mut nbuf = if s == 0 { vec![n] } else { Vec::new() };
    comm.broadcast(0, &mut nbuf);
    let n = nbuf[0];

    let nz = comm.scatter(0, &counts, 1)[0];

    if s == 0 {
        let mut tr = reader.expect("reader present on rank 0");
        // Rank 0's own slice comes first in the file
        let (rows, cols, values) = read_triples(&mut tr, counts[0])?;
        for q in 1..p {
            let (rq, cq, vq) = read_triples(&mut tr, counts[q])?;
            comm.send(q, TAG_ROWS, &rq);
            comm.send(q, TAG_COLS, &cq);
            comm.send(q, TAG_VALUES, &vq);
        }
        debug_assert_eq!(rows.len(), nz);
        Ok(TripleMatrix::new(n, rows, cols, values))
    } else {
        let rows = comm.recv::<usize>(0, TAG_ROWS);
        let cols = comm.recv::<usize>(0, TAG_COLS);
        let values = comm.recv::<f64>(0, TAG_VALUES);
        debug_assert_eq!(rows.len(), nz);
        Ok(TripleMatrix::new(n, rows, cols, values))
    }
}

/// Reads a vector-distribution file and hands each rank its ownership map
///
/// A collective call, used once for v and once for u. The file lists
/// `i proc` for i = 1..n in order. Rank 0 assigns local indices with a
/// per-owner counter and scatters (owner, global, local) triples in p
/// fixed-size batches, padding unused slots with −1 sentinels that the
/// receivers skip; a personalized exchange then forwards each
/// (global, local) pair to its owner, which unpacks `index[local] =
/// global`.
pub fn load_vector_distribution<C: Comm>(
    comm: &C,
    path: impl AsRef<Path>,
) -> Result<VectorDistribution> {
    let p = comm.size();
    let s = comm.rank();

    let mut reader = None;
    let mut n = 0usize;
    if s == 0 {
        let mut tr = TokenReader::open(path.as_ref())?;
        n = tr.next_usize("vector header: length")?;
        let pv = tr.next_usize("vector header: processor count")?;
        if pv != p {
            return Err(Error::VectorProcMismatch {
                declared: pv,
                runtime: p,
            });
        }
        reader = Some(tr);
    }
    let mut nbuf = if s == 0 { vec![n] } else { Vec::new() };
    comm.broadcast(0, &mut nbuf);
    let n = nbuf[0];

    // Batch geometry: about n/p components per batch, a fixed slice of
    // each batch per rank. Fixed-size scatters keep the exchange count
    // equal on every rank; the padding is skipped downstream.
    let batch = n.div_ceil(p);
    let slice = batch.div_ceil(p);

    let mut owner_counter = vec![0usize; p];
    let mut parked: Vec<i64> = Vec::with_capacity(3 * p * slice);
    for q in 0..p {
        let mut tmp = vec![-1i64; 3 * p * slice];
        if s == 0 {
            let tr = reader.as_mut().expect("reader present on rank 0");
            let mut w = 0;
            let lo = q * batch;
            let hi = ((q + 1) * batch).min(n);
            for k in lo..hi {
                let i = tr.next_usize("a component index")?;
                let proc = tr.next_usize("a component owner")?;
                if i != k + 1 {
                    return Err(Error::IndexOutOfOrder {
                        expected: k + 1,
                        found: i,
                    });
                }
                let owner = proc
                    .checked_sub(1)
                    .filter(|&o| o < p)
                    .ok_or_else(|| tr.parse_err("an owner between 1 and p"))?;
                tmp[w] = owner as i64;
                tmp[w + 1] = k as i64;
                tmp[w + 2] = owner_counter[owner] as i64;
                w += 3;
                owner_counter[owner] += 1;
            }
        }
        parked.extend(comm.scatter(0, &tmp, 3 * slice));
    }

    let nv = comm.scatter(0, &owner_counter, 1)[0];

    // Forward each (global, local) pair to its owner
    let mut counts = vec![0usize; p];
    for t in parked.chunks_exact(3) {
        if t[0] >= 0 {
            counts[t[0] as usize] += 2;
        }
    }
    let mut cursor = exclusive_prefix_sum(&counts);
    let mut sendbuf = vec![0i64; counts.iter().sum()];
    for t in parked.chunks_exact(3) {
        if t[0] >= 0 {
            let d = t[0] as usize;
            sendbuf[cursor[d]] = t[1];
            sendbuf[cursor[d] + 1] = t[2];
            cursor[d] += 2;
        }
    }
    let (pairs, _) = comm.all_to_allv(&sendbuf, &counts);

    let mut index = vec![0usize; nv];
    debug_assert_eq!(pairs.len(), 2 * nv);
    for pair in pairs.chunks_exact(2) {
        let (global, local) = (pair[0] as usize, pair[1] as usize);
        debug_assert!(local < nv, "assigned local index out of range");
        index[local] = global;
    }
    Ok(VectorDistribution::new(n, index))
}
