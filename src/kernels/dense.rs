//! Dense matrix kernels.
//!
//! The parallel implementations rely on the [`rayon`][1] crate.
//!
//! [1]: https://crates.io/crates/rayon

use super::{Matrix, TrialInput};
use crate::{
    definition::{AllocContext, Allocator, BenchmarkDefinition, KernelOperation, SizeFields},
    error::{AllocationError, KernelError},
    timing::{measure, KernelTimings},
    utils::BenchFloat,
};

use rayon::prelude::*;

use std::cmp::Ordering;

/// Input of the dense kernels.
pub struct DenseInput {
    pub a: Matrix<f64>,
    /// Right-hand side operand: a matrix for GEMM, a column vector for matvec and linsolve.
    pub b: Option<Matrix<f64>>,
}

/// Built-in dense operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenseOp {
    Matmat,
    Matvec,
    Crossprod,
    Cholesky,
    Linsolve,
}

// Parallel GEMM (`A * B`), row-wise with `ikj` loop order.
#[allow(non_snake_case)]
pub fn matmat<T: BenchFloat>(A: &Matrix<T>, B: &Matrix<T>) -> Result<Matrix<T>, KernelError> {
    assert_eq!(A.cols, B.rows);
    let mut C = Matrix::zeros(A.rows, B.cols)?;
    if B.cols == 0 {
        return Ok(C);
    }
    C.data
        .par_chunks_exact_mut(B.cols)
        .zip(A.data.par_chunks_exact(A.cols.max(1)))
        .for_each(|(c_row, a_row)| {
            for (a_il, b_row) in a_row.iter().zip(B.data.chunks_exact(B.cols)) {
                c_row
                    .iter_mut()
                    .zip(b_row)
                    .for_each(|(c_ij, b_lj)| *c_ij += *a_il * *b_lj);
            }
        });
    Ok(C)
}

// Parallel matrix-vector product.
#[allow(non_snake_case)]
pub fn matvec<T: BenchFloat>(A: &Matrix<T>, x: &[T]) -> Vec<T> {
    assert_eq!(A.cols, x.len());
    (0..A.rows)
        .into_par_iter()
        .map(|i| {
            A.row(i)
                .iter()
                .zip(x)
                .fold(T::zero(), |acc, (a, b)| acc + *a * *b)
        })
        .collect()
}

pub fn transpose<T: BenchFloat>(a: &Matrix<T>) -> Result<Matrix<T>, AllocationError> {
    let mut t = Matrix::zeros(a.cols, a.rows)?;
    for i in 0..a.rows {
        for j in 0..a.cols {
            t.data[j * a.rows + i] = a.data[i * a.cols + j];
        }
    }
    Ok(t)
}

// Cross product `Aᵀ * A`.
#[allow(non_snake_case)]
pub fn crossprod<T: BenchFloat>(A: &Matrix<T>) -> Result<Matrix<T>, KernelError> {
    matmat(&transpose(A)?, A)
}

/// Cholesky factorization `A = L * Lᵀ` of a symmetric positive definite matrix, returning the
/// lower-triangular factor `L`. Only the lower triangle of `A` is read.
#[allow(non_snake_case)]
pub fn cholesky<T: BenchFloat>(A: &Matrix<T>) -> Result<Matrix<T>, KernelError> {
    assert_eq!(A.rows, A.cols);
    let n = A.rows;
    let mut L = A.clone();

    for j in 0..n {
        let (head, tail) = L.data.split_at_mut((j + 1) * n);
        let row_j = &mut head[j * n..];

        let diag = row_j[j] - row_j[..j].iter().fold(T::zero(), |acc, v| acc + *v * *v);
        if diag.is_nan() || diag <= T::zero() {
            return Err(KernelError::NotPositiveDefinite(j));
        }
        let diag = diag.sqrt();
        row_j[j] = diag;
        row_j[j + 1..].iter_mut().for_each(|v| *v = T::zero());

        let row_j = &*row_j;
        tail.par_chunks_exact_mut(n).for_each(|row_i| {
            let dot = row_i[..j]
                .iter()
                .zip(&row_j[..j])
                .fold(T::zero(), |acc, (x, y)| acc + *x * *y);
            row_i[j] = (row_i[j] - dot) / diag;
        });
    }

    Ok(L)
}

/// Solves `A * x = b` with an LU factorization with partial pivoting.
#[allow(non_snake_case)]
pub fn lu_solve<T: BenchFloat>(A: &Matrix<T>, b: &[T]) -> Result<Vec<T>, KernelError> {
    assert_eq!(A.rows, A.cols);
    assert_eq!(A.rows, b.len());
    let n = A.rows;
    let mut lu = A.data.clone();
    let mut x = b.to_vec();

    for k in 0..n {
        let p = (k..n)
            .max_by(|&i, &j| {
                lu[i * n + k]
                    .abs()
                    .partial_cmp(&lu[j * n + k].abs())
                    .unwrap_or(Ordering::Equal)
            })
            .unwrap_or(k);
        if lu[p * n + k] == T::zero() || lu[p * n + k].is_nan() {
            return Err(KernelError::Singular(k));
        }
        if p != k {
            for c in 0..n {
                lu.swap(k * n + c, p * n + c);
            }
            x.swap(k, p);
        }

        let xk = x[k];
        let (head, tail) = lu.split_at_mut((k + 1) * n);
        let pivot_row = &head[k * n..];
        let pivot = pivot_row[k];
        tail.par_chunks_exact_mut(n)
            .zip(x[k + 1..].par_iter_mut())
            .for_each(|(row, xi)| {
                let factor = row[k] / pivot;
                row[k] = factor;
                row[k + 1..]
                    .iter_mut()
                    .zip(&pivot_row[k + 1..])
                    .for_each(|(r, p)| *r = *r - factor * *p);
                *xi = *xi - factor * xk;
            });
    }

    for i in (0..n).rev() {
        let row = &lu[i * n..(i + 1) * n];
        let s = row[i + 1..]
            .iter()
            .zip(&x[i + 1..])
            .fold(T::zero(), |acc, (a, b)| acc + *a * *b);
        x[i] = (x[i] - s) / row[i];
    }

    Ok(x)
}

/// Symmetric, strictly diagonally dominant matrix with a positive diagonal, hence positive
/// definite.
pub fn random_spd<T: BenchFloat, R: rand::Rng + ?Sized>(
    n: usize,
    rng: &mut R,
) -> Result<Matrix<T>, AllocationError> {
    let mut m = Matrix::zeros(n, n)?;
    for i in 0..n {
        for j in 0..i {
            let v = T::rand_scalar(rng);
            m.data[i * n + j] = v;
            m.data[j * n + i] = v;
        }
        m.data[i * n + i] = T::from_usize(n) + T::rand_scalar(rng);
    }
    Ok(m)
}

/// Allocator of the dense kernels: random operands of order `N`.
pub struct DenseAllocator(pub DenseOp);

impl Allocator for DenseAllocator {
    fn allocate(
        &self,
        definition: &BenchmarkDefinition,
        size_index: usize,
        ctx: &mut AllocContext<'_>,
    ) -> Result<TrialInput, AllocationError> {
        let n = match definition.sizes.fields(size_index) {
            SizeFields::Dense { n } => n,
            other => {
                return Err(AllocationError::InvalidSize(format!(
                    "dense kernel given {other}"
                )))
            }
        };
        let rng = &mut ctx.rng;

        let (a, b): (Matrix<f64>, Option<Matrix<f64>>) = match self.0 {
            DenseOp::Matmat => (Matrix::random(n, n, rng)?, Some(Matrix::random(n, n, rng)?)),
            DenseOp::Matvec => (Matrix::random(n, n, rng)?, Some(Matrix::random(n, 1, rng)?)),
            DenseOp::Crossprod => (Matrix::random(n, n, rng)?, None),
            DenseOp::Cholesky => (random_spd(n, rng)?, None),
            DenseOp::Linsolve => {
                let mut a: Matrix<f64> = Matrix::random(n, n, rng)?;
                for i in 0..n {
                    a.data[i * n + i] += n as f64;
                }
                (a, Some(Matrix::random(n, 1, rng)?))
            }
        };

        Ok(TrialInput::Dense(DenseInput { a, b }))
    }
}

/// Timed dense operation.
pub struct DenseKernel(pub DenseOp);

impl KernelOperation for DenseKernel {
    fn run(
        &self,
        _definition: &BenchmarkDefinition,
        input: &mut TrialInput,
    ) -> Result<KernelTimings, KernelError> {
        let TrialInput::Dense(dense) = input else {
            return Err(KernelError::InputMismatch {
                expected: "dense",
                actual: input.variant_name(),
            });
        };
        let rhs = || {
            dense
                .b
                .as_ref()
                .ok_or_else(|| KernelError::Other(format!("{:?} needs a right-hand side", self.0)))
        };

        let timings = match self.0 {
            DenseOp::Matmat => {
                let b = rhs()?;
                let (product, timings) = measure(|| matmat(&dense.a, b));
                product?;
                timings
            }
            DenseOp::Matvec => {
                let b = rhs()?;
                measure(|| matvec(&dense.a, b.as_slice())).1
            }
            DenseOp::Crossprod => {
                let (product, timings) = measure(|| crossprod(&dense.a));
                product?;
                timings
            }
            DenseOp::Cholesky => {
                let (factor, timings) = measure(|| cholesky(&dense.a));
                factor?;
                timings
            }
            DenseOp::Linsolve => {
                let b = rhs()?;
                let (solution, timings) = measure(|| lu_solve(&dense.a, b.as_slice()));
                solution?;
                timings
            }
        };

        Ok(timings)
    }
}
