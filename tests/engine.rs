use hpcbench::{
    dataset::DataDirLoader,
    definition::{BenchmarkDefinition, ProblemSizes, SizeFields},
    drivers::{run_microbenchmark, run_suite, MicrobenchmarkRunner, RunSettings},
    error::{AllocationError, KernelError},
    kernels::TrialInput,
    perf_report::summary_file_path,
    stats,
    timing::KernelTimings,
};

use tempfile::TempDir;

use std::{
    fs,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

fn settings(output_dir: &Path, run_tag: &str) -> RunSettings {
    RunSettings {
        thread_count: 4,
        output_dir: output_dir.to_path_buf(),
        run_tag: run_tag.to_string(),
        seed: 1234,
    }
}

fn wall(seconds: f64) -> KernelTimings {
    KernelTimings {
        user: seconds / 2.0,
        system: 0.0,
        wall: seconds,
    }
}

fn dense(name: &str, dims: Vec<usize>) -> BenchmarkDefinition {
    BenchmarkDefinition::new(name, ProblemSizes::Dense { dims })
}

fn constant(def: BenchmarkDefinition, seconds: f64) -> BenchmarkDefinition {
    def.allocate_with(|_, _, _| Ok(TrialInput::Empty))
        .run_with(move |_, _| Ok(wall(seconds)))
}

fn summary_lines(dir: &Path, name: &str, run_tag: &str) -> Vec<String> {
    fs::read_to_string(summary_file_path(dir, name, run_tag))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn summary_values(line: &str) -> Vec<f64> {
    line.split(',').map(|v| v.parse().unwrap()).collect()
}

#[test]
fn mismatched_lengths_produce_nothing() {
    let full = vec![10, 20];
    let short = vec![10];
    // One shortened sequence at a time: rows, cols, nonzeros, trials, warmups.
    for shortened in 0..5 {
        let pick = |i: usize| if i == shortened { short.clone() } else { full.clone() };
        let counts = |i: usize| -> Vec<u32> {
            if i == shortened {
                vec![2]
            } else {
                vec![2, 2]
            }
        };

        let def = constant(
            BenchmarkDefinition::new(
                "spmv",
                ProblemSizes::Sparse {
                    rows: pick(0),
                    cols: pick(1),
                    nonzeros: pick(2),
                },
            )
            .trials(counts(3), counts(4)),
            1.0,
        );

        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let table = run_microbenchmark(&def, &settings(&out, "mismatch"), None);

        assert!(table.is_empty(), "shortened sequence {shortened}");
        assert!(!summary_file_path(&out, "spmv", "mismatch").exists());
    }
}

#[test]
fn warmup_trials_are_not_recorded() {
    let dir = TempDir::new().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    // Size 4: calls 0-1 are warm-ups, 2-4 measured. Size 8: call 5 is a warm-up, 6-7 measured.
    let warmup_calls = [0, 1, 5];
    let def = dense("matmat", vec![4, 8])
        .trials(vec![3, 2], vec![2, 1])
        .allocate_with(|_, _, _| Ok(TrialInput::Empty))
        .run_with(move |_, _| {
            let call = counter.fetch_add(1, Ordering::SeqCst);
            if warmup_calls.contains(&call) {
                Ok(wall(100.0))
            } else {
                Ok(wall(call as f64))
            }
        });

    let table = run_microbenchmark(&def, &settings(dir.path(), "warm"), None);
    assert_eq!(calls.load(Ordering::SeqCst), 8);

    let walls: Vec<_> = table.rows().iter().map(|r| r.wall_time).collect();
    assert_eq!(walls, [2.0, 3.0, 4.0, 6.0, 7.0]);
    let sizes: Vec<_> = table.rows().iter().map(|r| r.sizes).collect();
    assert_eq!(
        sizes,
        [
            SizeFields::Dense { n: 4 },
            SizeFields::Dense { n: 4 },
            SizeFields::Dense { n: 4 },
            SizeFields::Dense { n: 8 },
            SizeFields::Dense { n: 8 },
        ]
    );
    assert!(table
        .rows()
        .iter()
        .all(|r| r.name == "matmat" && r.date_started <= r.date_finished));

    let lines = summary_lines(dir.path(), "matmat", "warm");
    assert_eq!(lines[0], "num_threads,n,avg_wall_time,std_dev_wall_time");
    assert_eq!(summary_values(&lines[1]), [4.0, 4.0, 3.0, 1.0]);
    let second = summary_values(&lines[2]);
    assert_eq!(second[..3], [4.0, 8.0, 6.5]);
    assert!((second[3] - 0.5_f64.sqrt()).abs() < 1e-12);
}

#[test]
fn statistics_over_successful_prefix() {
    let samples = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
    assert_eq!(stats::average(8, &samples), 5.0);
    assert!((stats::std_dev(8, &samples) - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);

    // Entries past the success count are never read.
    let mut buffer = samples.to_vec();
    buffer.extend([f64::NAN, 1e9]);
    assert_eq!(stats::average(8, &buffer), 5.0);
    assert!((stats::std_dev(8, &buffer) - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);

    assert!(stats::average(0, &buffer).is_nan());
    assert!(stats::std_dev(1, &buffer).is_nan());
}

#[test]
fn zero_successes_still_write_a_row() {
    let dir = TempDir::new().unwrap();
    let def = dense("cholesky", vec![5])
        .trials(vec![3], vec![1])
        .allocate_with(|_, _, _| Err(AllocationError::Other("out of memory".into())))
        .run_with(|_, _| Ok(wall(1.0)));

    let table = run_microbenchmark(&def, &settings(dir.path(), "none"), None);
    assert!(table.is_empty());
    assert_eq!(
        summary_lines(dir.path(), "cholesky", "none"),
        [
            "num_threads,n,avg_wall_time,std_dev_wall_time",
            "4,5,NaN,NaN"
        ]
    );
}

#[test]
fn failing_size_does_not_affect_the_others() {
    let dir = TempDir::new().unwrap();
    let def = BenchmarkDefinition::new(
        "kmeans",
        ProblemSizes::Clustering {
            features: vec![2, 3, 4],
            clusters: vec![2, 2, 2],
            vectors_per_cluster: vec![10, 10, 10],
        },
    )
    .trials(vec![2, 2, 2], vec![1, 1, 1])
    .allocate_with(|_, size_index, _| {
        if size_index == 1 {
            Err(AllocationError::InvalidSize("no room".into()))
        } else {
            Ok(TrialInput::Empty)
        }
    })
    .run_with(|_, _| Ok(wall(2.0)));

    let table = run_microbenchmark(&def, &settings(dir.path(), "partial"), None);
    let features: Vec<_> = table
        .rows()
        .iter()
        .map(|r| match r.sizes {
            SizeFields::Clustering { features, .. } => features,
            other => panic!("unexpected {other}"),
        })
        .collect();
    assert_eq!(features, [2, 2, 4, 4]);

    assert_eq!(
        summary_lines(dir.path(), "kmeans", "partial"),
        [
            "num_threads,num_features,num_clusters,num_vectors_per_cluster,avg_wall_time,std_dev_wall_time",
            "4,2,2,10,2,0",
            "4,3,2,10,NaN,NaN",
            "4,4,2,10,2,0",
        ]
    );
}

#[test]
fn kernel_failure_keeps_earlier_measurements() {
    let dir = TempDir::new().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let def = dense("linsolve", vec![3])
        .trials(vec![5], vec![0])
        .allocate_with(|_, _, _| Ok(TrialInput::Empty))
        .run_with(move |_, _| match counter.fetch_add(1, Ordering::SeqCst) {
            0 => Ok(wall(1.0)),
            1 => Ok(wall(3.0)),
            _ => Err(KernelError::Singular(0)),
        });

    let table = run_microbenchmark(&def, &settings(dir.path(), "kfail"), None);
    assert_eq!(table.len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let lines = summary_lines(dir.path(), "linsolve", "kfail");
    let row = summary_values(&lines[1]);
    assert_eq!(row[..3], [4.0, 3.0, 2.0]);
    assert!((row[3] - 2.0_f64.sqrt()).abs() < 1e-12);
}

#[test]
fn suite_concatenates_active_definitions_in_order() {
    let dir = TempDir::new().unwrap();
    let defs = [
        constant(dense("a", vec![1, 2]).trials(vec![1, 2], vec![0, 0]), 1.0),
        constant(dense("b", vec![1]).trials(vec![4], vec![0]), 2.0).active(false),
        constant(dense("c", vec![3]).trials(vec![2], vec![1]), 3.0),
    ];

    let table = run_suite(
        &defs,
        &MicrobenchmarkRunner,
        &DataDirLoader::new(vec![]),
        &settings(dir.path(), "suite"),
    )
    .unwrap()
    .unwrap();

    let names: Vec<_> = table.rows().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["a", "a", "a", "c", "c"]);
    assert!(summary_file_path(dir.path(), "a", "suite").exists());
    assert!(!summary_file_path(dir.path(), "b", "suite").exists());
    assert!(summary_file_path(dir.path(), "c", "suite").exists());
}

#[test]
fn empty_suite_is_distinguishable_from_empty_results() {
    let dir = TempDir::new().unwrap();
    let loader = DataDirLoader::new(vec![]);
    let settings = settings(dir.path(), "empty");

    assert!(run_suite(&[], &MicrobenchmarkRunner, &loader, &settings)
        .unwrap()
        .is_none());

    let only_inactive = [constant(dense("off", vec![1]).trials(vec![1], vec![0]), 1.0).active(false)];
    let table = run_suite(&only_inactive, &MicrobenchmarkRunner, &loader, &settings)
        .unwrap()
        .unwrap();
    assert!(table.is_empty());
}

#[test]
fn summary_file_is_appended_across_runs() {
    let dir = TempDir::new().unwrap();
    let settings = settings(dir.path(), "again");

    let first = constant(dense("matvec", vec![16]).trials(vec![2], vec![0]), 1.0);
    let second = constant(dense("matvec", vec![32, 64]).trials(vec![2, 2], vec![0, 0]), 1.0);
    run_microbenchmark(&first, &settings, None);
    run_microbenchmark(&second, &settings, None);

    assert_eq!(
        summary_lines(dir.path(), "matvec", "again"),
        [
            "num_threads,n,avg_wall_time,std_dev_wall_time",
            "4,16,1,0",
            "4,32,1,0",
            "4,64,1,0",
        ]
    );
}

#[test]
fn shared_dataset_is_loaded_once_per_definition() {
    let data = TempDir::new().unwrap();
    fs::write(
        data.path().join("diag.mtx"),
        "%%MatrixMarket matrix coordinate real general\n3 3 3\n1 1 1.0\n2 2 2.0\n3 3 3.0\n",
    )
    .unwrap();
    let out = TempDir::new().unwrap();

    let allocations = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&allocations);
    let uses_dataset = BenchmarkDefinition::new(
        "diag",
        ProblemSizes::Sparse {
            rows: vec![3],
            cols: vec![3],
            nonzeros: vec![3],
        },
    )
    .data_source("diag")
    .trials(vec![3], vec![1])
    .allocate_with(move |def, _, ctx| match ctx.dataset {
        Some(_) => {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(TrialInput::Empty)
        }
        None => Err(AllocationError::MissingDataset {
            name: def.name.clone(),
        }),
    })
    .run_with(|_, _| Ok(wall(1.0)));
    let missing = constant(dense("missing", vec![2]).trials(vec![1], vec![0]), 1.0)
        .data_source("not-there");

    let table = run_suite(
        &[missing, uses_dataset],
        &MicrobenchmarkRunner,
        &DataDirLoader::new(vec![data.path().to_path_buf()]),
        &settings(out.path(), "data"),
    )
    .unwrap()
    .unwrap();

    assert_eq!(allocations.load(Ordering::SeqCst), 4);
    assert_eq!(table.len(), 3);
    assert!(!summary_file_path(out.path(), "missing", "data").exists());
}

#[test]
fn builtin_kernels_run_end_to_end() {
    let dir = TempDir::new().unwrap();
    let defs: Vec<_> = ["matmat", "cholesky", "linsolve", "spmm", "kmeans"]
        .into_iter()
        .map(|kernel| {
            let entry = hpcbench::kernels::lookup(kernel).unwrap();
            let sizes = match entry.kind {
                hpcbench::definition::KernelKind::Dense => ProblemSizes::Dense { dims: vec![8] },
                hpcbench::definition::KernelKind::Sparse => ProblemSizes::Sparse {
                    rows: vec![20],
                    cols: vec![10],
                    nonzeros: vec![50],
                },
                hpcbench::definition::KernelKind::Clustering => ProblemSizes::Clustering {
                    features: vec![2],
                    clusters: vec![3],
                    vectors_per_cluster: vec![5],
                },
            };
            BenchmarkDefinition::new(kernel, sizes)
                .trials(vec![2], vec![1])
                .allocator(entry.allocator)
                .kernel(entry.kernel)
        })
        .collect();

    let table = run_suite(
        &defs,
        &MicrobenchmarkRunner,
        &DataDirLoader::new(vec![]),
        &settings(dir.path(), "e2e"),
    )
    .unwrap()
    .unwrap();

    assert_eq!(table.len(), 10);
    assert!(table.rows().iter().all(|r| r.wall_time >= 0.0));

    let raw = dir.path().join("raw.csv");
    table.write_csv(&raw).unwrap();
    let text = fs::read_to_string(raw).unwrap();
    assert_eq!(text.lines().count(), 11);
    assert!(text.contains("spmm,num_rows=20 num_cols=10 num_nonzeros=50,"));
}

#[test]
fn oversized_problem_size_fails_only_that_definition() {
    let dir = TempDir::new().unwrap();
    let matvec = |name: &str, n: usize| {
        let entry = hpcbench::kernels::lookup("matvec").unwrap();
        dense(name, vec![n])
            .trials(vec![1], vec![0])
            .allocator(entry.allocator)
            .kernel(entry.kernel)
    };
    let defs = [matvec("huge", 1 << 33), matvec("small", 4)];

    let table = run_suite(
        &defs,
        &MicrobenchmarkRunner,
        &DataDirLoader::new(vec![]),
        &settings(dir.path(), "oom"),
    )
    .unwrap()
    .unwrap();

    assert_eq!(table.len(), 1);
    assert_eq!(table.rows()[0].name, "small");
    assert_eq!(
        summary_lines(dir.path(), "huge", "oom"),
        [
            "num_threads,n,avg_wall_time,std_dev_wall_time",
            "4,8589934592,NaN,NaN"
        ]
    );
    assert_eq!(summary_lines(dir.path(), "small", "oom").len(), 2);
}
