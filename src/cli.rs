//! Command-Line Interface related code.
//!
//! This module handles the parsing of CLI arguments using the [`clap`][1] crate.
//! It defines the availables runtime options and subcommands.
//!
//! [1]: https://crates.io/crates/clap

use crate::consts;

use clap::{Args, Parser, Subcommand};

use std::path::PathBuf;

/// Microbenchmark harness for numerical kernels.
///
/// Runs dense linear algebra, sparse linear algebra and clustering kernels over series of problem
/// sizes, and records per-size timing summaries in CSV files. The reported thread count is read
/// from the variable named by `HPCBENCH_NUM_THREADS_VARIABLE` (e.g. `OMP_NUM_THREADS`).
#[derive(Clone, Debug, Parser)]
#[command(name = "hpcbench", version)]
pub struct CliArgs {
    /// Suite to run or inspect.
    #[command(subcommand)]
    pub command: SuiteCmd,

    /// Enable debug logging (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// List of available suites.
#[derive(Clone, Debug, PartialEq, Subcommand)]
pub enum SuiteCmd {
    /// Dense matrix kernels: matmat, matvec, crossprod, cholesky, linsolve
    Dense(RunArgs),
    /// Sparse matrix kernels: spmv, spmm
    Sparse(RunArgs),
    /// Clustering kernels: kmeans
    Clustering(RunArgs),
    /// Every built-in suite
    All(RunArgs),
    /// Suite described in a TOML file
    Suite {
        /// Path to the suite file.
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Print the definitions of a suite without running them
    List {
        /// Suite file to list instead of the built-in suites.
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

/// Options shared by every run.
#[derive(Args, Clone, Debug, PartialEq)]
pub struct RunArgs {
    /// Tag appended to the summary file names, distinguishing one run from another.
    #[arg(short, long, value_name = "TAG")]
    pub run_tag: String,

    /// Directory receiving the summary files.
    #[arg(
        short,
        long,
        value_name = "DIR",
        default_value = consts::DEFAULT_OUTPUT_DIR,
    )]
    pub output_dir: PathBuf,

    /// Seed for the random number generator (RNG), reset before every trial.
    #[arg(short, long, value_name = "SEED", default_value_t = consts::DEFAULT_SEED)]
    pub seed: u64,

    /// Directory searched first for shared datasets.
    #[arg(
        short,
        long,
        value_name = "DIR",
        default_value = consts::DEFAULT_DATA_DIR,
    )]
    pub data_dir: PathBuf,

    /// Only run the named benchmarks, even if inactive.
    #[arg(long, value_name = "NAME", num_args = 1..)]
    pub only: Vec<String>,

    /// Write the raw per-trial results of the whole suite to this CSV file.
    #[arg(long, value_name = "FILE")]
    pub raw_output: Option<PathBuf>,
}

impl SuiteCmd {
    /// Run options, if the command runs a suite.
    pub fn run_args(&self) -> Option<&RunArgs> {
        match self {
            Self::Dense(run) | Self::Sparse(run) | Self::Clustering(run) | Self::All(run) => {
                Some(run)
            }
            Self::Suite { run, .. } => Some(run),
            Self::List { .. } => None,
        }
    }
}
