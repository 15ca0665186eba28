//! Microbenchmark driver.
//!
//! This module implements the trial loop of a single benchmark definition.

use crate::{
    dataset::SharedDataset,
    definition::{AllocContext, BenchmarkDefinition},
    perf_report::{
        summary_file_path, write_summary_row, RawResultsTable, SummaryRecord, TrialRecord,
    },
    stats,
};

use chrono::Local;
use rand::{rngs::SmallRng, SeedableRng};
use tracing::{debug, error, info};

use std::{fs, path::PathBuf};

/// Settings shared by every definition of a suite run.
#[derive(Clone, Debug)]
pub struct RunSettings {
    /// Thread count written to the summary files. Reporting only.
    pub thread_count: u32,
    /// Directory receiving the summary files.
    pub output_dir: PathBuf,
    /// Tag appended to the summary file names.
    pub run_tag: String,
    /// Seed the RNG is reset to before every allocation.
    pub seed: u64,
}

/// Runs every problem size of a definition. The orchestrator only depends on this trait, so
/// alternative runners can be plugged in.
pub trait KernelRunner {
    fn run(
        &self,
        definition: &BenchmarkDefinition,
        settings: &RunSettings,
        dataset: Option<&SharedDataset>,
    ) -> RawResultsTable;
}

impl<F> KernelRunner for F
where
    F: Fn(&BenchmarkDefinition, &RunSettings, Option<&SharedDataset>) -> RawResultsTable,
{
    fn run(
        &self,
        definition: &BenchmarkDefinition,
        settings: &RunSettings,
        dataset: Option<&SharedDataset>,
    ) -> RawResultsTable {
        self(definition, settings, dataset)
    }
}

/// The default runner, see [`run_microbenchmark`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MicrobenchmarkRunner;

impl KernelRunner for MicrobenchmarkRunner {
    fn run(
        &self,
        definition: &BenchmarkDefinition,
        settings: &RunSettings,
        dataset: Option<&SharedDataset>,
    ) -> RawResultsTable {
        run_microbenchmark(definition, settings, dataset)
    }
}

/// Runs the warm-up and measured trials of every problem size of `definition`, in order.
///
/// For each problem size, the RNG is reset to `settings.seed` before every call to the
/// allocator, so all trials of a size see the same input. The first allocation or kernel failure
/// ends the trials of that size; the summary row is written anyway, from the measured trials
/// that succeeded before it, and the next size starts normally.
///
/// One summary row per size is appended to `<output_dir>/<name>_<run_tag>.csv`. The returned
/// table holds one record per successful measured trial. An invalid definition is reported and
/// yields an empty table without touching the output directory.
pub fn run_microbenchmark(
    definition: &BenchmarkDefinition,
    settings: &RunSettings,
    dataset: Option<&SharedDataset>,
) -> RawResultsTable {
    let mut table = RawResultsTable::new();

    let num_sizes = match definition.validate() {
        Ok(n) => n,
        Err(e) => {
            error!(benchmark = %definition.name, "invalid benchmark configuration: {e}");
            return table;
        }
    };
    let (Some(allocator), Some(kernel)) = (&definition.allocator, &definition.kernel) else {
        return table;
    };

    if let Err(e) = fs::create_dir_all(&settings.output_dir) {
        error!(
            benchmark = %definition.name,
            "cannot create output directory {}: {e}",
            settings.output_dir.display()
        );
        return table;
    }
    let csv_path = summary_file_path(&settings.output_dir, &definition.name, &settings.run_tag);

    info!(
        benchmark = %definition.name,
        kind = %definition.kind(),
        "running {num_sizes} problem size(s)"
    );

    // Shared by all sizes; only the first `succeeded` entries are meaningful.
    let max_trials = definition.trial_counts.iter().copied().max().unwrap_or(0) as usize;
    let mut timings = vec![f64::NAN; max_trials];

    for j in 0..num_sizes {
        let sizes = definition.sizes.fields(j);
        let trials = definition.trial_counts[j];
        let warmups = definition.warmup_counts[j];
        let mut succeeded = 0;

        for i in 1..=trials.saturating_add(warmups) {
            let mut ctx = AllocContext {
                rng: SmallRng::seed_from_u64(settings.seed),
                dataset,
            };
            let mut input = match allocator.allocate(definition, j, &mut ctx) {
                Ok(input) => input,
                Err(e) => {
                    error!(
                        benchmark = %definition.name,
                        size_index = j,
                        trial = i,
                        "allocation failed, skipping remaining trials of this size: {e}"
                    );
                    break;
                }
            };

            let date_started = Local::now();
            let elapsed = match kernel.run(definition, &mut input) {
                Ok(elapsed) => elapsed,
                Err(e) => {
                    error!(
                        benchmark = %definition.name,
                        size_index = j,
                        trial = i,
                        "kernel failed, skipping remaining trials of this size: {e}"
                    );
                    break;
                }
            };
            let date_finished = Local::now();

            let warmup = i <= warmups;
            if !warmup {
                table.push(TrialRecord {
                    name: definition.name.clone(),
                    sizes,
                    user_time: elapsed.user,
                    system_time: elapsed.system,
                    wall_time: elapsed.wall,
                    date_started,
                    date_finished,
                });
                timings[(i - warmups - 1) as usize] = elapsed.wall;
                succeeded += 1;
            }
            debug!(
                benchmark = %definition.name,
                size_index = j,
                trial = i,
                warmup,
                wall = elapsed.wall,
                "trial done"
            );

            drop(input);
        }

        let summary = SummaryRecord {
            num_threads: settings.thread_count,
            sizes,
            avg_wall_time: stats::average(succeeded, &timings),
            std_dev_wall_time: stats::std_dev(succeeded, &timings),
        };
        if let Err(e) = write_summary_row(&summary, &csv_path) {
            error!(
                benchmark = %definition.name,
                "failed to write summary row to {}: {e}",
                csv_path.display()
            );
        }
        info!(
            benchmark = %definition.name,
            "{summary} ({succeeded}/{trials} trials succeeded)"
        );
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        definition::ProblemSizes, error::AllocationError, kernels::TrialInput,
        timing::KernelTimings,
    };

    use rand::Rng;
    use tempfile::TempDir;

    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };

    fn settings(dir: &TempDir) -> RunSettings {
        RunSettings {
            thread_count: 2,
            output_dir: dir.path().join("out"),
            run_tag: "unit".into(),
            seed: 11,
        }
    }

    #[test]
    fn allocator_sees_same_random_stream_every_trial() {
        let dir = TempDir::new().unwrap();
        let draws = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&draws);

        let def = BenchmarkDefinition::new("seeded", ProblemSizes::Dense { dims: vec![1, 2] })
            .trials(vec![2, 1], vec![1, 1])
            .allocate_with(move |_, _, ctx| {
                seen.lock().unwrap().push(ctx.rng.gen::<u64>());
                Ok(TrialInput::Empty)
            })
            .run_with(|_, _| Ok(KernelTimings::default()));

        let table = run_microbenchmark(&def, &settings(&dir), None);
        assert_eq!(table.len(), 3);

        let draws = draws.lock().unwrap();
        assert_eq!(draws.len(), 5);
        assert!(draws.iter().all(|d| *d == draws[0]));
    }

    #[test]
    fn kernel_failure_stops_only_the_current_size() {
        let dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        // Third kernel call of the first size fails: one warm-up, one measured, then failure.
        let def = BenchmarkDefinition::new("flaky", ProblemSizes::Dense { dims: vec![8, 16] })
            .trials(vec![4, 2], vec![1, 0])
            .allocate_with(|_, _, _| Ok(TrialInput::Empty))
            .run_with(move |_, _| {
                if counter.fetch_add(1, Ordering::SeqCst) == 2 {
                    Err(crate::error::KernelError::Other("boom".into()))
                } else {
                    Ok(KernelTimings {
                        user: 0.0,
                        system: 0.0,
                        wall: 1.0,
                    })
                }
            });

        let table = run_microbenchmark(&def, &settings(&dir), None);
        assert_eq!(table.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 5);

        let csv = std::fs::read_to_string(dir.path().join("out/flaky_unit.csv")).unwrap();
        assert_eq!(
            csv,
            "num_threads,n,avg_wall_time,std_dev_wall_time\n2,8,1,NaN\n2,16,1,0\n"
        );
    }

    #[test]
    fn missing_dataset_is_an_allocation_failure() {
        let dir = TempDir::new().unwrap();
        let def = BenchmarkDefinition::new(
            "needs_data",
            ProblemSizes::Sparse {
                rows: vec![4],
                cols: vec![4],
                nonzeros: vec![4],
            },
        )
        .trials(vec![1], vec![0])
        .allocate_with(|def, _, ctx| {
            ctx.dataset
                .map(|_| TrialInput::Empty)
                .ok_or_else(|| AllocationError::MissingDataset {
                    name: def.name.clone(),
                })
        })
        .run_with(|_, _| Ok(KernelTimings::default()));

        let table = run_microbenchmark(&def, &settings(&dir), None);
        assert!(table.is_empty());
    }
}
