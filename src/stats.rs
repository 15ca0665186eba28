//! Summary statistics over the successful trials of a problem size.
//!
//! The timing buffer of a problem size is allocated once with room for the largest trial count
//! of the definition, so only its first `success_count` entries are meaningful. Both functions
//! ignore everything past that prefix.

use statistical::{mean, standard_deviation};

/// Arithmetic mean of the first `success_count` timings, or NaN when there are none.
pub fn average(success_count: usize, timings: &[f64]) -> f64 {
    match successful(success_count, timings) {
        [] => f64::NAN,
        samples => mean(samples),
    }
}

/// Sample standard deviation (divisor `success_count - 1`) of the first `success_count`
/// timings, or NaN when fewer than two are available.
pub fn std_dev(success_count: usize, timings: &[f64]) -> f64 {
    let samples = successful(success_count, timings);
    if samples.len() < 2 {
        return f64::NAN;
    }
    standard_deviation(samples, Some(mean(samples)))
}

fn successful(success_count: usize, timings: &[f64]) -> &[f64] {
    &timings[..success_count.min(timings.len())]
}
