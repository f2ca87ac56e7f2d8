//! Stable counting sort for matrix triples
//!
//! Sorting a triple set by one of its index arrays is the workhorse of the
//! ICRS conversion. The sort is by counting into radix-sized bins, so a
//! full sort of indices in 0..n costs two linear passes instead of a
//! comparison sort's n log n.

/// Which part of an index serves as the sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Key is `index / radix`
    Div,
    /// Key is `index % radix`
    Mod,
}

/// The smallest power of two >= sqrt(n)
///
/// With this radix, one MOD pass followed by one DIV pass is a complete
/// least-significant-digit radix sort of indices in 0..n, and both the
/// bin array and the key computation stay cheap.
pub fn radix_for(n: usize) -> usize {
    let mut radix = 1;
    while radix * radix < n {
        radix *= 2;
    }
    radix
}

fn key(i: usize, radix: usize, keytype: SortKey) -> usize {
    match keytype {
        SortKey::Div => i / radix,
        SortKey::Mod => i % radix,
    }
}

/// Stably sorts the triples (keys[k], companions[k], values[k]) by
/// `key(keys[k], radix, keytype)`
///
/// All three arrays are permuted together. Ties keep their original
/// relative order, so calling this twice (first with [`SortKey::Mod`],
/// then with [`SortKey::Div`]) sorts the triples by ascending `keys[k]`.
///
/// `n` is the global index range (keys lie in 0..n); it bounds the bin
/// count for the DIV pass. Runs in Θ(nz + nbins) time and memory.
///
/// # Panics
///
/// Panics if the arrays differ in length or `radix` is zero.
pub fn sort_by_key<T: Copy>(
    n: usize,
    keys: &mut [usize],
    companions: &mut [usize],
    values: &mut [T],
    radix: usize,
    keytype: SortKey,
) {
    assert_eq!(keys.len(), companions.len());
    assert_eq!(keys.len(), values.len());
    assert!(radix >= 1, "radix must be at least 1");

    let nz = keys.len();
    let nbins = match keytype {
        SortKey::Div => n.div_ceil(radix),
        SortKey::Mod => radix,
    };

    // Count the elements in each bin
    let mut lengthbin = vec![0usize; nbins];
    for k in 0..nz {
        lengthbin[key(keys[k], radix, keytype)] += 1;
    }

    // Exclusive prefix sum gives the starting position of each bin
    let mut startbin = vec![0usize; nbins];
    for r in 1..nbins {
        startbin[r] = startbin[r - 1] + lengthbin[r - 1];
    }

    // Emit the triples into temporary arrays, advancing the bin cursors
    let mut keys1 = vec![0usize; nz];
    let mut companions1 = vec![0usize; nz];
    let mut values1 = values.to_vec();
    for k in 0..nz {
        let r = key(keys[k], radix, keytype);
        let newk = startbin[r];
        keys1[newk] = keys[k];
        companions1[newk] = companions[k];
        values1[newk] = values[k];
        startbin[r] += 1;
    }

    keys.copy_from_slice(&keys1);
    companions.copy_from_slice(&companions1);
    values.copy_from_slice(&values1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radix_for() {
        assert_eq!(radix_for(0), 1);
        assert_eq!(radix_for(1), 1);
        assert_eq!(radix_for(2), 2);
        assert_eq!(radix_for(4), 2);
        assert_eq!(radix_for(5), 4);
        assert_eq!(radix_for(16), 4);
        assert_eq!(radix_for(17), 8);
        assert_eq!(radix_for(1_000_000), 1024);
    }

    #[test]
    fn test_single_mod_pass_is_stable() {
        // With radix 4, keys 1, 5, 9 all land in bin 1; their original
        // order must survive. The companion array tracks original slots.
        let mut keys = vec![5, 2, 9, 1, 6];
        let mut companions = vec![0, 1, 2, 3, 4];
        let mut values = vec![50.0, 20.0, 90.0, 10.0, 60.0];

        sort_by_key(16, &mut keys, &mut companions, &mut values, 4, SortKey::Mod);

        assert_eq!(keys, vec![5, 9, 1, 2, 6]);
        assert_eq!(companions, vec![0, 2, 3, 1, 4]);
        assert_eq!(values, vec![50.0, 90.0, 10.0, 20.0, 60.0]);
    }

    #[test]
    fn test_mod_then_div_sorts_ascending() {
        let n = 100;
        let radix = radix_for(n);
        let mut keys = vec![42, 7, 99, 0, 55, 7, 23, 88, 7];
        let mut companions: Vec<usize> = (0..keys.len()).collect();
        let mut values: Vec<f64> = keys.iter().map(|&k| k as f64).collect();

        sort_by_key(n, &mut keys, &mut companions, &mut values, radix, SortKey::Mod);
        sort_by_key(n, &mut keys, &mut companions, &mut values, radix, SortKey::Div);

        assert_eq!(keys, vec![0, 7, 7, 7, 23, 42, 55, 88, 99]);
        // The three 7s came from original slots 1, 5, 8, in that order
        assert_eq!(&companions[1..4], &[1, 5, 8]);
        for (k, v) in keys.iter().zip(&values) {
            assert_eq!(*k as f64, *v);
        }
    }

    #[test]
    fn test_empty_input() {
        let mut keys: Vec<usize> = vec![];
        let mut companions: Vec<usize> = vec![];
        let mut values: Vec<f64> = vec![];
        sort_by_key(10, &mut keys, &mut companions, &mut values, 4, SortKey::Div);
        assert!(keys.is_empty());
    }
}
