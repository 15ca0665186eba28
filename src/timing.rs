//! Elapsed-time measurement of kernel calls.
//!
//! Wall-clock time comes from [`Instant`]. User and system CPU times come from `getrusage`
//! (through the [`libc`][1] crate) on unix targets and are reported as zero elsewhere. CPU times
//! cover the whole process, so they include the work of the kernel's worker threads.
//!
//! [1]: https://crates.io/crates/libc

use std::time::Instant;

/// Durations of a single kernel call, in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct KernelTimings {
    pub user: f64,
    pub system: f64,
    pub wall: f64,
}

/// Runs `f` once and returns its output together with the time it took.
pub fn measure<R, F: FnOnce() -> R>(f: F) -> (R, KernelTimings) {
    let (user_start, system_start) = cpu_times();
    let start = Instant::now();
    let out = std::hint::black_box(f());
    let wall = start.elapsed().as_secs_f64();
    let (user_end, system_end) = cpu_times();

    (
        out,
        KernelTimings {
            user: (user_end - user_start).max(0.0),
            system: (system_end - system_start).max(0.0),
            wall,
        },
    )
}

#[cfg(unix)]
fn cpu_times() -> (f64, f64) {
    use std::mem::MaybeUninit;

    fn seconds(tv: libc::timeval) -> f64 {
        tv.tv_sec as f64 + tv.tv_usec as f64 * 1e-6
    }

    let mut usage = MaybeUninit::<libc::rusage>::zeroed();
    // SAFETY: `getrusage` only writes into the provided struct.
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if rc != 0 {
        return (0.0, 0.0);
    }
    // SAFETY: initialized by the successful call above.
    let usage = unsafe { usage.assume_init() };
    (seconds(usage.ru_utime), seconds(usage.ru_stime))
}

#[cfg(not(unix))]
fn cpu_times() -> (f64, f64) {
    (0.0, 0.0)
}
