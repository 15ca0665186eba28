//! Utility functions and traits.

use crate::{
    consts,
    error::{AllocationError, ConfigError},
};

use rand::{
    distributions::{uniform::SampleUniform, Distribution, Uniform},
    Rng,
};

use std::ops::{AddAssign, MulAssign};

/// Utility trait that generalizes floating-point types in hpcbench and implements common
/// functionnalities needed by the kernels and allocators.
///
/// Also provides a generic way of generating floating-point scalars and vectors in the wanted
/// type from a caller-supplied RNG, so that the caller decides when the generator is reseeded.
pub trait BenchFloat:
    num::Float + Default + AddAssign + MulAssign + SampleUniform + Send + Sync + 'static
{
    /// Produces a random scalar of type `T`, in the range [0.0, 1.0).
    fn rand_scalar<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Uniform::new(Self::zero(), Self::one()).sample(rng)
    }

    /// Produces a random vector of type `T` and length `n`, filled with values in the range
    /// [0.0, 1.0). Fails instead of aborting if the vector does not fit in memory.
    fn rand_vector<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Result<Vec<Self>, AllocationError> {
        let between = Uniform::new(Self::zero(), Self::one());
        let mut v = try_vec_with_capacity(n)?;
        v.extend((0..n).map(|_| between.sample(rng)));
        Ok(v)
    }

    /// Lossy conversion from a `usize`, used for diagonal shifts and averages.
    fn from_usize(n: usize) -> Self {
        <Self as num::NumCast>::from(n).unwrap_or_else(<Self as num::Float>::max_value)
    }
}

impl BenchFloat for f32 {}

impl BenchFloat for f64 {}

/// Number of elements of a `rows x cols` buffer, or an error if it overflows `usize`.
pub fn checked_len(rows: usize, cols: usize) -> Result<usize, AllocationError> {
    rows.checked_mul(cols).ok_or_else(|| {
        AllocationError::InvalidSize(format!("{rows} x {cols} elements overflow the address space"))
    })
}

/// Empty vector with room for exactly `len` elements.
///
/// Problem sizes may be chosen close to the memory limits of the machine, so a failed
/// reservation is reported as an [`AllocationError`] rather than aborting the process.
pub fn try_vec_with_capacity<T>(len: usize) -> Result<Vec<T>, AllocationError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|source| AllocationError::OutOfMemory {
            elements: len,
            source,
        })?;
    Ok(v)
}

/// Reads the thread count to report from the process environment.
///
/// See [`thread_count_with`] for the lookup rules.
pub fn thread_count_from_env() -> Result<u32, ConfigError> {
    thread_count_with(|var| std::env::var(var).ok())
}

/// Resolves the reported thread count through a two-level indirection: the variable
/// [`consts::NUM_THREADS_VARIABLE`] names a second variable (e.g. `OMP_NUM_THREADS`) whose value
/// is the thread count.
///
/// The value is only recorded in the summary files; it never changes how many threads the
/// kernels use.
pub fn thread_count_with<F>(lookup: F) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let target = lookup(consts::NUM_THREADS_VARIABLE)
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(consts::NUM_THREADS_VARIABLE.to_string()))?;
    let target = target.trim();

    let value = lookup(target).ok_or_else(|| ConfigError::MissingEnvVar(target.to_string()))?;

    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidThreadCount {
            var: target.to_string(),
            value,
        }),
    }
}
