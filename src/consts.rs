//! Crate-level constants.

/// Default seed used to reset the random number generator (RNG) before every trial.
pub const DEFAULT_SEED: u64 = 42;

/// Environment variable holding the *name* of the variable that stores the thread count.
pub const NUM_THREADS_VARIABLE: &str = "HPCBENCH_NUM_THREADS_VARIABLE";

/// Default directory where the summary CSV files are written.
pub const DEFAULT_OUTPUT_DIR: &str = "results";

/// Default directory searched for shared datasets, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "data";

/// File extension of shared datasets (Matrix Market coordinate format).
pub const DATASET_EXTENSION: &str = "mtx";

/// Number of Lloyd iterations performed by the k-means kernel.
pub const KMEANS_ITERATIONS: usize = 10;

/// Number of dense right-hand side columns multiplied by the sparse SpMM kernel.
pub const SPMM_RHS_COLUMNS: usize = 16;
