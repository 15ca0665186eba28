//! Error types.
//!
//! Each failure class of the engine has its own type so that the runner and the orchestrator
//! can decide how far a failure is allowed to propagate: configuration errors abandon a whole
//! definition, allocation and kernel errors only abort the current problem size, dataset errors
//! skip a definition. [`BenchError`] is what reaches the command-line front-end.

use std::{collections::TryReserveError, io, path::PathBuf};

use thiserror::Error;

/// Invalid benchmark configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("benchmark `{name}`: `{field}` has {actual} entries, expected {expected}")]
    LengthMismatch {
        name: String,
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("benchmark `{name}`: no {capability} configured")]
    MissingCapability {
        name: String,
        capability: &'static str,
    },

    #[error("duplicate benchmark name `{0}` in suite")]
    DuplicateName(String),

    #[error("no benchmark named `{0}`")]
    UnknownBenchmark(String),

    #[error("benchmark `{name}`: unknown kernel `{kernel}` (expected one of: {known})")]
    UnknownKernel {
        name: String,
        kernel: String,
        known: String,
    },

    #[error("benchmark `{name}`: {message}")]
    KindMismatch { name: String, message: String },

    #[error("environment variable `{0}` is not set")]
    MissingEnvVar(String),

    #[error("environment variable `{var}` has invalid thread count `{value}`")]
    InvalidThreadCount { var: String, value: String },

    #[error("failed to parse suite file {path}: {source}")]
    SuiteFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Failure while producing the input of a trial.
#[derive(Error, Debug)]
pub enum AllocationError {
    #[error("benchmark `{name}` expects a shared dataset but none was loaded")]
    MissingDataset { name: String },

    #[error("invalid problem size: {0}")]
    InvalidSize(String),

    #[error("cannot allocate {elements} elements: {source}")]
    OutOfMemory {
        elements: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("{0}")]
    Other(String),
}

/// Failure of the timed operation.
#[derive(Error, Debug)]
pub enum KernelError {
    #[error("kernel received {actual} input, expected {expected}")]
    InputMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("matrix is not positive definite (pivot {0})")]
    NotPositiveDefinite(usize),

    #[error("matrix is singular (column {0})")]
    Singular(usize),

    #[error("cannot allocate kernel output: {0}")]
    Allocation(#[from] AllocationError),

    #[error("{0}")]
    Other(String),
}

/// Failure while loading a shared dataset.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("dataset `{name}` not found (searched {searched:?})")]
    NotFound { name: String, searched: Vec<PathBuf> },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed Matrix Market file at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Failure while persisting results.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Top-level error type.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
