//! Suite driver.
//!
//! Walks a list of benchmark definitions in order, loading shared datasets around each of them
//! and collecting the raw trial records produced by the runner.

use super::microbenchmark::{KernelRunner, RunSettings};
use crate::{
    dataset::DatasetLoader, definition::BenchmarkDefinition, error::ConfigError,
    perf_report::RawResultsTable,
};

use tracing::{debug, error, info, warn};

use std::collections::HashSet;

/// Runs every active definition of `definitions` with `runner`, in list order.
///
/// Returns `Ok(None)` when the list is empty. Inactive definitions are skipped, as are
/// definitions whose data source cannot be loaded; both are reported and do not stop the suite.
/// The loaded dataset is released before the next definition starts.
///
/// # Errors
/// The list is checked before anything runs: two definitions sharing a name would write to the
/// same summary file, so the call fails with [`ConfigError::DuplicateName`].
pub fn run_suite(
    definitions: &[BenchmarkDefinition],
    runner: &dyn KernelRunner,
    loader: &dyn DatasetLoader,
    settings: &RunSettings,
) -> Result<Option<RawResultsTable>, ConfigError> {
    if definitions.is_empty() {
        warn!("no benchmark to run");
        return Ok(None);
    }

    let mut names = HashSet::with_capacity(definitions.len());
    for def in definitions {
        if !names.insert(def.name.as_str()) {
            return Err(ConfigError::DuplicateName(def.name.clone()));
        }
    }

    let mut results = RawResultsTable::new();
    for def in definitions {
        if !def.active {
            debug!(benchmark = %def.name, "benchmark is inactive, skipping");
            continue;
        }

        let dataset = match &def.data_source {
            Some(source) => match loader.load(source) {
                Ok(dataset) => Some(dataset),
                Err(e) => {
                    error!(benchmark = %def.name, "cannot load dataset `{source}`, skipping: {e}");
                    continue;
                }
            },
            None => None,
        };

        let mut rows = runner.run(def, settings, dataset.as_ref());
        drop(dataset);

        info!(benchmark = %def.name, "collected {} trial record(s)", rows.len());
        results.append(&mut rows);
    }

    Ok(Some(results))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        dataset::SharedDataset,
        definition::ProblemSizes,
        error::DatasetError,
        kernels::CsrMatrix,
        perf_report::TrialRecord,
    };

    use chrono::Local;

    use std::{cell::RefCell, sync::Arc};

    struct FakeLoader;

    impl DatasetLoader for FakeLoader {
        fn load(&self, name: &str) -> Result<SharedDataset, DatasetError> {
            match name {
                "tiny" => Ok(SharedDataset::SparseMatrix(Arc::new(
                    CsrMatrix::from_triplets(1, 1, vec![(0, 0, 1.0)]),
                ))),
                _ => Err(DatasetError::NotFound {
                    name: name.into(),
                    searched: vec![],
                }),
            }
        }
    }

    fn settings() -> RunSettings {
        RunSettings {
            thread_count: 1,
            output_dir: std::env::temp_dir(),
            run_tag: "never-written".into(),
            seed: 0,
        }
    }

    fn def(name: &str) -> BenchmarkDefinition {
        BenchmarkDefinition::new(name, ProblemSizes::Dense { dims: vec![1] })
    }

    // Records one row per call, named after the definition, plus whether a dataset was given.
    fn recording_runner(
        log: &RefCell<Vec<(String, bool)>>,
    ) -> impl Fn(&BenchmarkDefinition, &RunSettings, Option<&SharedDataset>) -> RawResultsTable + '_
    {
        move |def: &BenchmarkDefinition, _: &RunSettings, dataset: Option<&SharedDataset>| {
            log.borrow_mut().push((def.name.clone(), dataset.is_some()));
            let mut table = RawResultsTable::new();
            table.push(TrialRecord {
                name: def.name.clone(),
                sizes: def.sizes.fields(0),
                user_time: 0.0,
                system_time: 0.0,
                wall_time: 1.0,
                date_started: Local::now(),
                date_finished: Local::now(),
            });
            table
        }
    }

    #[test]
    fn empty_suite_yields_nothing() {
        let runner = |_: &BenchmarkDefinition, _: &RunSettings, _: Option<&SharedDataset>| {
            RawResultsTable::new()
        };
        assert!(run_suite(&[], &runner, &FakeLoader, &settings())
            .unwrap()
            .is_none());
    }

    #[test]
    fn duplicate_names_are_rejected_before_running() {
        let log = RefCell::new(Vec::new());
        let runner = recording_runner(&log);
        let err = run_suite(&[def("a"), def("a")], &runner, &FakeLoader, &settings()).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateName(name) if name == "a"));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn skips_inactive_and_unloadable_definitions() {
        let log = RefCell::new(Vec::new());
        let runner = recording_runner(&log);
        let defs = [
            def("first"),
            def("off").active(false),
            def("broken").data_source("nowhere"),
            def("loaded").data_source("tiny"),
        ];

        let table = run_suite(&defs, &runner, &FakeLoader, &settings())
            .unwrap()
            .unwrap();

        let names: Vec<_> = table.rows().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["first", "loaded"]);
        assert_eq!(
            *log.borrow(),
            [("first".to_string(), false), ("loaded".to_string(), true)]
        );
    }
}
