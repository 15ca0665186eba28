//! Kernel implementations.
//!
//! This module contains the numerical kernels benchmarked by the default suites, along with the
//! allocators producing their inputs. Each kernel kind comes as a pair of capabilities:
//! - an [`Allocator`] generating (or borrowing from a shared dataset) the input of one trial;
//! - a [`KernelOperation`] timing the kernel on that input.
//!
//! The kernels themselves are generic over [`BenchFloat`] and parallelized with [`rayon`][1].
//! Their degree of parallelism is whatever the rayon global pool provides (see
//! `RAYON_NUM_THREADS`); the engine never changes it.
//!
//! [1]: https://crates.io/crates/rayon

pub mod clustering;
pub mod dense;
pub mod sparse;

use crate::{
    definition::{Allocator, KernelKind, KernelOperation},
    error::AllocationError,
    utils::{checked_len, try_vec_with_capacity, BenchFloat},
};

use rand::Rng;

use std::sync::Arc;

pub use clustering::ClusterData;
pub use dense::DenseInput;
pub use sparse::{CsrMatrix, SparseInput};

/// Input of a single trial, as produced by an allocator.
pub enum TrialInput {
    /// No data, for kernels that produce their own.
    Empty,
    Dense(DenseInput),
    Sparse(SparseInput),
    Clusters(ClusterData),
}

impl TrialInput {
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Dense(_) => "dense",
            Self::Sparse(_) => "sparse",
            Self::Clusters(_) => "cluster",
        }
    }
}

/// Row-major dense matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: BenchFloat> Matrix<T> {
    /// Zero-filled matrix. Fails if the buffer does not fit in memory.
    pub fn zeros(rows: usize, cols: usize) -> Result<Self, AllocationError> {
        let len = checked_len(rows, cols)?;
        let mut data = try_vec_with_capacity(len)?;
        data.resize(len, T::zero());
        Ok(Self { rows, cols, data })
    }

    /// Matrix filled with values in [0.0, 1.0) drawn from `rng`.
    pub fn random<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        rng: &mut R,
    ) -> Result<Self, AllocationError> {
        let data = T::rand_vector(checked_len(rows, cols)?, rng)?;
        Ok(Self { rows, cols, data })
    }

    /// Wraps row-major `data`; returns `None` if its length is not `rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Option<Self> {
        (data.len() == rows * cols).then_some(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, i: usize, j: usize) -> T {
        self.data[i * self.cols + j]
    }

    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

/// Names of the built-in kernels, as used in suite files.
pub const KERNEL_NAMES: &[&str] = &[
    "matmat",
    "matvec",
    "crossprod",
    "cholesky",
    "linsolve",
    "spmv",
    "spmm",
    "kmeans",
];

/// Capabilities of a built-in kernel.
pub struct KernelEntry {
    pub kind: KernelKind,
    pub allocator: Arc<dyn Allocator>,
    pub kernel: Arc<dyn KernelOperation>,
}

/// Looks up a built-in kernel by name.
pub fn lookup(name: &str) -> Option<KernelEntry> {
    use dense::DenseOp;
    use sparse::SparseOp;

    let dense = |op: DenseOp| KernelEntry {
        kind: KernelKind::Dense,
        allocator: Arc::new(dense::DenseAllocator(op)),
        kernel: Arc::new(dense::DenseKernel(op)),
    };
    let sparse = |op: SparseOp| KernelEntry {
        kind: KernelKind::Sparse,
        allocator: Arc::new(sparse::SparseAllocator(op)),
        kernel: Arc::new(sparse::SparseKernel(op)),
    };

    match name {
        "matmat" => Some(dense(DenseOp::Matmat)),
        "matvec" => Some(dense(DenseOp::Matvec)),
        "crossprod" => Some(dense(DenseOp::Crossprod)),
        "cholesky" => Some(dense(DenseOp::Cholesky)),
        "linsolve" => Some(dense(DenseOp::Linsolve)),
        "spmv" => Some(sparse(SparseOp::Spmv)),
        "spmm" => Some(sparse(SparseOp::Spmm)),
        "kmeans" => Some(KernelEntry {
            kind: KernelKind::Clustering,
            allocator: Arc::new(clustering::ClusterAllocator),
            kernel: Arc::new(clustering::KmeansKernel),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_kernel_resolves() {
        for name in KERNEL_NAMES {
            assert!(lookup(name).is_some(), "{name}");
        }
        assert!(lookup("eigen").is_none());
        assert_eq!(lookup("spmm").unwrap().kind, KernelKind::Sparse);
    }

    #[test]
    fn matrix_from_vec_checks_shape() {
        assert!(Matrix::from_vec(2, 2, vec![1.0_f64; 3]).is_none());
        let m = Matrix::from_vec(2, 3, vec![1.0_f64, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(m.get(1, 0), 4.0);
        assert_eq!(m.row(0), &[1.0, 2.0, 3.0]);
    }
}
