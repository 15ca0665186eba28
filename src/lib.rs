//! hpcbench - microbenchmarks for numerical kernels
//!
//! # About
//! hpcbench is a microbenchmark harness measuring the run-time performance of numerical kernels
//! across hardware platforms and threading configurations. A benchmark definition describes a
//! series of problem sizes, along with the number of warm-up and measured trials to run for each
//! of them. The engine runs the trials, isolates failing sizes without aborting the run, and
//! appends a timing summary to a CSV file after every problem size, so that partial progress
//! survives an interrupted run.
//!
//! Currently, hpcbench ships the following kernels, parallelized with [`rayon`][1]:
//! - dense: GEMM, matrix-vector product, cross product, Cholesky factorization, linear solve
//! - sparse (CSR): SpMV, sparse times dense block
//! - clustering: k-means
//!
//! The harness does not control the degree of parallelism of the kernels it measures. The thread
//! count written to the result files is read from the environment, for reporting only: the
//! `HPCBENCH_NUM_THREADS_VARIABLE` variable holds the *name* of the variable storing it.
//!
//! # Quickstart
//! ## Build
//! As any Rust-based project, hpcbench is built and run with `cargo`:
//! ```sh
//! cargo build --release
//! ```
//!
//! ## Help
//! To see the help usage:
//! ```sh
//! cargo run -- help
//!
//! Microbenchmark harness for numerical kernels.
//!
//! Usage: hpcbench [OPTIONS] <COMMAND>
//!
//! Commands:
//!   dense       Dense matrix kernels: matmat, matvec, crossprod, cholesky, linsolve
//!   sparse      Sparse matrix kernels: spmv, spmm
//!   clustering  Clustering kernels: kmeans
//!   all         Every built-in suite
//!   suite       Suite described in a TOML file
//!   list        Print the definitions of a suite without running them
//!   help        Print this message or the help of the given subcommand(s)
//!
//! Options:
//!   -v, --verbose  Enable debug logging (overridden by `RUST_LOG`)
//!   -h, --help     Print help (see more with '--help')
//!   -V, --version  Print version
//! ```
//!
//! ## Example run
//! To run the dense suite with 8 OpenMP-style threads and a run tag of `node01`:
//! ```sh
//! export OMP_NUM_THREADS=8 RAYON_NUM_THREADS=8
//! export HPCBENCH_NUM_THREADS_VARIABLE=OMP_NUM_THREADS
//! cargo run --release -- dense --run-tag node01 --output-dir results
//! ```
//! This produces one file per benchmark, such as `results/matmat_node01.csv`.
//!
//! ## Documentation
//! The crate's documentation is available using `cargo`:
//! ```sh
//! cargo doc --open
//! ```
//!
//! [1]: https://crates.io/crates/rayon

pub mod cli;
pub mod config;
pub mod consts;
pub mod dataset;
pub mod definition;
pub mod drivers;
pub mod error;
pub mod kernels;
pub mod perf_report;
pub mod stats;
pub mod suites;
pub mod timing;
pub mod utils;
