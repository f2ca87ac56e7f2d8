use std::io::Write;

use clap::Parser;

use parmv::{
    load_matrix, load_vector_distribution, matvec, run_spmd, triple_to_icrs, Comm, MatvecPlan,
};

/// Distributed sparse matrix-vector multiplication
///
/// Reads a distributed matrix and two vector distributions, builds the
/// communication plan, and times repeated multiplications u = A·v. The
/// three file paths are prompted for on standard input.
#[derive(Parser)]
#[command(name = "parmv", version)]
struct Args {
    /// Number of SPMD ranks to run
    #[arg(short = 'p', long, default_value_t = num_cpus::get())]
    procs: usize,

    /// Number of timed multiplications
    #[arg(long, default_value_t = parmv::DEFAULT_ITERATIONS)]
    iters: usize,
}

fn prompt(text: &str) -> String {
    println!("{text}");
    std::io::stdout().flush().ok();
    let mut line = String::new();
    std::io::stdin().read_line(&mut line).ok();
    line.trim().to_string()
}

fn fail<C: Comm>(comm: &C, err: parmv::Error) -> ! {
    eprintln!("parmv: {err}");
    comm.abort(err.abort_code());
}

fn rank_main<C: Comm>(comm: &C, n_iters: usize) {
    let s = comm.rank();
    let p = comm.size();

    // Only rank 0 reads the prompts and the files; everyone else takes
    // its share over the communicator.
    let mpath = if s == 0 {
        prompt("Please enter the filename of the matrix distribution")
    } else {
        String::new()
    };
    let triples = load_matrix(comm, &mpath).unwrap_or_else(|e| fail(comm, e));
    let matrix = triple_to_icrs(triples);

    let vpath = if s == 0 {
        prompt("Please enter the filename of the v-vector distribution")
    } else {
        String::new()
    };
    let vdist = load_vector_distribution(comm, &vpath).unwrap_or_else(|e| fail(comm, e));

    let upath = if s == 0 {
        prompt("Please enter the filename of the u-vector distribution")
    } else {
        String::new()
    };
    let udist = load_vector_distribution(comm, &upath).unwrap_or_else(|e| fail(comm, e));

    if s == 0 {
        println!("Sparse matrix-vector multiplication using {p} processors");
    }

    // Input vector: component value is its global index plus one
    let v: Vec<f64> = vdist.index.iter().map(|&g| (g + 1) as f64).collect();
    let mut u = vec![0.0; udist.local_len()];

    if s == 0 {
        println!("Initialization for matrix-vector multiplications");
    }
    comm.barrier();
    let time0 = comm.wall_time();

    let plan = MatvecPlan::build(comm, &matrix, &vdist, &udist);

    if s == 0 {
        println!("Start of {n_iters} matrix-vector multiplications.");
    }
    comm.barrier();
    let time1 = comm.wall_time();

    for _ in 0..n_iters {
        matvec(comm, &matrix, &plan, &v, &mut u);
    }
    comm.barrier();
    let time2 = comm.wall_time();

    if s == 0 {
        println!("End of matrix-vector multiplications.");
        println!("Initialization took only {:.6} seconds.", time1 - time0);
        println!(
            "Each matvec took only {:.6} seconds.",
            (time2 - time1) / n_iters as f64
        );
        println!("Total time for {} iterations: {:.6}", n_iters, time2 - time1);
    }
}

fn main() {
    let args = Args::parse();
    run_spmd(args.procs, |comm| rank_main(&comm, args.iters));
}
