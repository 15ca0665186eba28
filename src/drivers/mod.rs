//! Benchmark drivers.
//!
//! This module provides the API for running benchmark definitions and recording their results.
//! It only manipulates kernels through the [`crate::definition::Allocator`] and
//! [`crate::definition::KernelOperation`] capabilities, so it never needs to know which
//! operation it is timing.
//!
//! # High-level approach for kernel profiling
//! ## 1. Data initialization
//! Before every trial, the random number generator is reset to the run's seed and the
//! definition's allocator builds a fresh input. Every trial of a given problem size therefore
//! operates on the exact same data. When a definition names a shared dataset, it is loaded once
//! by the [`suite`] driver and handed to the allocator for every trial.
//!
//! ## 2. Performance evaluation
//! Each problem size runs a number of warm-up trials, which are timed but discarded, followed by
//! the measured trials (see [`crate::definition::BenchmarkDefinition`] for the per-size counts).
//! The kernel reports the user, system and wall-clock time of the timed operation. The first
//! failure of an allocation or a kernel ends the trials of the current size only.
//!
//! ## 3. Post-processing
//! The average and sample standard deviation of the measured wall-clock times are appended to a
//! per-definition CSV file after each problem size, so that an interrupted run keeps its
//! completed sizes (see [`crate::perf_report`] for the file layout). The raw per-trial records
//! of every definition are concatenated into a single table by the [`suite`] driver.

pub mod microbenchmark;
pub mod suite;

pub use microbenchmark::{run_microbenchmark, KernelRunner, MicrobenchmarkRunner, RunSettings};
pub use suite::run_suite;
