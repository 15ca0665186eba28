//! Built-in benchmark suites.
//!
//! Each kernel kind comes with a default suite. Definitions covering large problem sizes are
//! inactive by default: they can be enabled individually with `--only`, or through a suite file.

use crate::{
    definition::{BenchmarkDefinition, ProblemSizes, Suite},
    error::ConfigError,
    kernels::{
        clustering::{ClusterAllocator, KmeansKernel},
        dense::{DenseAllocator, DenseKernel, DenseOp},
        sparse::{SparseAllocator, SparseKernel, SparseOp},
    },
};

use std::sync::Arc;

/// Name of the Matrix Market dataset bundled in the crate's `data` directory: the 2D Laplacian on
/// a 16x16 grid (5-point stencil).
pub const BUNDLED_DATASET: &str = "laplace_2d_16";

fn dense(
    name: &str,
    op: DenseOp,
    dims: Vec<usize>,
    trials: Vec<u32>,
    warmups: Vec<u32>,
) -> BenchmarkDefinition {
    BenchmarkDefinition::new(name, ProblemSizes::Dense { dims })
        .trials(trials, warmups)
        .allocator(Arc::new(DenseAllocator(op)))
        .kernel(Arc::new(DenseKernel(op)))
}

// `sizes` holds `(rows, cols, nonzeros)` triples.
fn sparse(
    name: &str,
    op: SparseOp,
    sizes: &[(usize, usize, usize)],
    trials: Vec<u32>,
    warmups: Vec<u32>,
) -> BenchmarkDefinition {
    let sizes = ProblemSizes::Sparse {
        rows: sizes.iter().map(|s| s.0).collect(),
        cols: sizes.iter().map(|s| s.1).collect(),
        nonzeros: sizes.iter().map(|s| s.2).collect(),
    };
    BenchmarkDefinition::new(name, sizes)
        .trials(trials, warmups)
        .allocator(Arc::new(SparseAllocator(op)))
        .kernel(Arc::new(SparseKernel(op)))
}

// `sizes` holds `(features, clusters, vectors_per_cluster)` triples.
fn kmeans(
    name: &str,
    sizes: &[(usize, usize, usize)],
    trials: Vec<u32>,
    warmups: Vec<u32>,
) -> BenchmarkDefinition {
    let sizes = ProblemSizes::Clustering {
        features: sizes.iter().map(|s| s.0).collect(),
        clusters: sizes.iter().map(|s| s.1).collect(),
        vectors_per_cluster: sizes.iter().map(|s| s.2).collect(),
    };
    BenchmarkDefinition::new(name, sizes)
        .trials(trials, warmups)
        .allocator(Arc::new(ClusterAllocator))
        .kernel(Arc::new(KmeansKernel))
}

/// Dense matrix kernels.
pub fn dense_suite() -> Result<Suite, ConfigError> {
    Suite::new(vec![
        dense("matmat", DenseOp::Matmat, vec![64, 128, 256], vec![10, 10, 5], vec![2, 2, 1])
            .description("General matrix-matrix multiplication"),
        dense("matmat_large", DenseOp::Matmat, vec![1024, 2048], vec![3, 3], vec![1, 1])
            .description("General matrix-matrix multiplication, large orders")
            .active(false),
        dense("matvec", DenseOp::Matvec, vec![256, 1024, 4096], vec![20, 20, 10], vec![2, 2, 2])
            .description("Matrix-vector multiplication"),
        dense("crossprod", DenseOp::Crossprod, vec![64, 128, 256], vec![10, 10, 5], vec![2, 2, 1])
            .description("Cross product of a matrix with itself"),
        dense("cholesky", DenseOp::Cholesky, vec![128, 256, 512], vec![10, 5, 5], vec![2, 1, 1])
            .description("Cholesky factorization of a symmetric positive definite matrix"),
        dense("linsolve", DenseOp::Linsolve, vec![128, 256, 512], vec![10, 5, 5], vec![2, 1, 1])
            .description("Linear system solve with partial pivoting"),
        dense("linsolve_large", DenseOp::Linsolve, vec![2048, 4096], vec![3, 3], vec![1, 1])
            .description("Linear system solve with partial pivoting, large orders")
            .active(false),
    ])
}

/// Sparse matrix kernels.
pub fn sparse_suite() -> Result<Suite, ConfigError> {
    Suite::new(vec![
        sparse(
            "spmv",
            SparseOp::Spmv,
            &[
                (1_000, 1_000, 10_000),
                (10_000, 10_000, 100_000),
                (100_000, 100_000, 1_000_000),
            ],
            vec![20, 20, 10],
            vec![2, 2, 2],
        )
        .description("Sparse matrix-vector multiplication"),
        sparse(
            "spmv_large",
            SparseOp::Spmv,
            &[(1_000_000, 1_000_000, 10_000_000)],
            vec![5],
            vec![1],
        )
        .description("Sparse matrix-vector multiplication, large matrix")
        .active(false),
        sparse(
            "spmm",
            SparseOp::Spmm,
            &[(1_000, 1_000, 10_000), (10_000, 10_000, 100_000)],
            vec![10, 10],
            vec![2, 2],
        )
        .description("Sparse matrix times dense block"),
        sparse("spmv_laplace", SparseOp::Spmv, &[(256, 256, 1_216)], vec![50], vec![5])
            .description("Sparse matrix-vector multiplication on the bundled 2D Laplacian")
            .data_source(BUNDLED_DATASET),
    ])
}

/// Clustering kernels.
pub fn clustering_suite() -> Result<Suite, ConfigError> {
    Suite::new(vec![
        kmeans(
            "kmeans",
            &[(2, 4, 1_000), (8, 8, 1_000), (32, 16, 500)],
            vec![10, 10, 5],
            vec![1, 1, 1],
        )
        .description("Lloyd's k-means clustering"),
        kmeans("kmeans_large", &[(64, 64, 2_000)], vec![3], vec![1])
            .description("Lloyd's k-means clustering, many clusters")
            .active(false),
    ])
}

/// Every built-in suite, dense first.
pub fn all_suites() -> Result<Suite, ConfigError> {
    let mut suite = dense_suite()?;
    suite.extend(sparse_suite()?)?;
    suite.extend(clustering_suite()?)?;
    Ok(suite)
}
