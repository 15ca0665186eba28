//! Sparse matrix kernels on compressed sparse row (CSR) storage.

use super::{Matrix, TrialInput};
use crate::{
    consts::SPMM_RHS_COLUMNS,
    dataset::SharedDataset,
    definition::{AllocContext, Allocator, BenchmarkDefinition, KernelOperation, SizeFields},
    error::{AllocationError, KernelError},
    timing::{measure, KernelTimings},
    utils::{try_vec_with_capacity, BenchFloat},
};

use rand::{seq::index, Rng};
use rayon::prelude::*;

use std::sync::Arc;

/// Sparse matrix in compressed sparse row format, with sorted column indices in each row.
#[derive(Clone, Debug, PartialEq)]
pub struct CsrMatrix<T> {
    rows: usize,
    cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<T>,
}

impl<T: BenchFloat> CsrMatrix<T> {
    /// Builds a matrix from `(row, col, value)` entries, summing duplicates.
    ///
    /// # Panics
    /// Panics if an entry lies outside the `rows x cols` shape.
    pub fn from_triplets(rows: usize, cols: usize, mut triplets: Vec<(usize, usize, T)>) -> Self {
        triplets.sort_unstable_by_key(|&(r, c, _)| (r, c));

        let mut row_ptr = vec![0; rows + 1];
        let mut col_idx = Vec::with_capacity(triplets.len());
        let mut values: Vec<T> = Vec::with_capacity(triplets.len());
        let mut last = None;
        for (r, c, v) in triplets {
            assert!(r < rows && c < cols, "entry ({r}, {c}) outside {rows}x{cols}");
            if last == Some((r, c)) {
                if let Some(acc) = values.last_mut() {
                    *acc += v;
                }
                continue;
            }
            last = Some((r, c));
            row_ptr[r + 1] += 1;
            col_idx.push(c);
            values.push(v);
        }
        for r in 0..rows {
            row_ptr[r + 1] += row_ptr[r];
        }

        Self {
            rows,
            cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Random matrix with exactly `nonzeros` stored entries spread evenly over the rows, each row
    /// holding distinct columns.
    pub fn random<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        nonzeros: usize,
        rng: &mut R,
    ) -> Result<Self, AllocationError> {
        if nonzeros > rows.saturating_mul(cols) {
            return Err(AllocationError::InvalidSize(format!(
                "{nonzeros} nonzeros do not fit in a {rows}x{cols} matrix"
            )));
        }

        let mut row_ptr = try_vec_with_capacity(rows.saturating_add(1))?;
        let mut col_idx = try_vec_with_capacity(nonzeros)?;
        row_ptr.push(0);
        if rows > 0 {
            let (base, extra) = (nonzeros / rows, nonzeros % rows);
            for r in 0..rows {
                let count = base + usize::from(r < extra);
                let mut picked = index::sample(rng, cols, count).into_vec();
                picked.sort_unstable();
                col_idx.extend(picked);
                row_ptr.push(col_idx.len());
            }
        }
        let values = T::rand_vector(col_idx.len(), rng)?;

        Ok(Self {
            rows,
            cols,
            row_ptr,
            col_idx,
            values,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn nonzeros(&self) -> usize {
        self.values.len()
    }

    fn row(&self, i: usize) -> (&[usize], &[T]) {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        (&self.col_idx[range.clone()], &self.values[range])
    }
}

// Parallel sparse matrix-vector product.
pub fn spmv<T: BenchFloat>(a: &CsrMatrix<T>, x: &[T]) -> Vec<T> {
    assert_eq!(a.cols, x.len());
    (0..a.rows)
        .into_par_iter()
        .map(|i| {
            let (cols, vals) = a.row(i);
            cols.iter()
                .zip(vals)
                .fold(T::zero(), |acc, (&c, v)| acc + *v * x[c])
        })
        .collect()
}

// Parallel product of a sparse matrix with a dense block.
#[allow(non_snake_case)]
pub fn spmm<T: BenchFloat>(a: &CsrMatrix<T>, B: &Matrix<T>) -> Result<Matrix<T>, AllocationError> {
    assert_eq!(a.cols, B.rows);
    let mut C = Matrix::zeros(a.rows, B.cols)?;
    if B.cols == 0 {
        return Ok(C);
    }
    C.data
        .par_chunks_exact_mut(B.cols)
        .enumerate()
        .for_each(|(i, c_row)| {
            let (cols, vals) = a.row(i);
            for (&l, &a_il) in cols.iter().zip(vals) {
                c_row
                    .iter_mut()
                    .zip(B.row(l))
                    .for_each(|(c_ij, b_lj)| *c_ij += a_il * *b_lj);
            }
        });
    Ok(C)
}

/// Input of the sparse kernels.
pub struct SparseInput {
    /// Shared with the loaded dataset when the definition names one.
    pub a: Arc<CsrMatrix<f64>>,
    /// Dense operand with `a.cols()` rows.
    pub x: Matrix<f64>,
}

/// Built-in sparse operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SparseOp {
    Spmv,
    Spmm,
}

impl SparseOp {
    fn rhs_columns(self) -> usize {
        match self {
            Self::Spmv => 1,
            Self::Spmm => SPMM_RHS_COLUMNS,
        }
    }
}

/// Allocator of the sparse kernels.
///
/// Definitions with a data source reuse the loaded matrix; the others get a random matrix with
/// the requested shape and number of nonzeros.
pub struct SparseAllocator(pub SparseOp);

impl Allocator for SparseAllocator {
    fn allocate(
        &self,
        definition: &BenchmarkDefinition,
        size_index: usize,
        ctx: &mut AllocContext<'_>,
    ) -> Result<TrialInput, AllocationError> {
        let a = if definition.data_source.is_some() {
            match ctx.dataset {
                Some(SharedDataset::SparseMatrix(m)) => Arc::clone(m),
                None => {
                    return Err(AllocationError::MissingDataset {
                        name: definition.name.clone(),
                    })
                }
            }
        } else {
            match definition.sizes.fields(size_index) {
                SizeFields::Sparse {
                    rows,
                    cols,
                    nonzeros,
                } => Arc::new(CsrMatrix::random(rows, cols, nonzeros, &mut ctx.rng)?),
                other => {
                    return Err(AllocationError::InvalidSize(format!(
                        "sparse kernel given {other}"
                    )))
                }
            }
        };
        let x = Matrix::random(a.cols(), self.0.rhs_columns(), &mut ctx.rng)?;

        Ok(TrialInput::Sparse(SparseInput { a, x }))
    }
}

/// Timed sparse operation.
pub struct SparseKernel(pub SparseOp);

impl KernelOperation for SparseKernel {
    fn run(
        &self,
        _definition: &BenchmarkDefinition,
        input: &mut TrialInput,
    ) -> Result<KernelTimings, KernelError> {
        let TrialInput::Sparse(sparse) = input else {
            return Err(KernelError::InputMismatch {
                expected: "sparse",
                actual: input.variant_name(),
            });
        };

        let timings = match self.0 {
            SparseOp::Spmv => measure(|| spmv(&*sparse.a, sparse.x.as_slice())).1,
            SparseOp::Spmm => {
                let (product, timings) = measure(|| spmm(&*sparse.a, &sparse.x));
                product?;
                timings
            }
        };
        Ok(timings)
    }
}
