use hpcbench::{
    cli::{CliArgs, SuiteCmd},
    config,
    dataset::DataDirLoader,
    definition::Suite,
    drivers::{self, MicrobenchmarkRunner, RunSettings},
    error::BenchError,
    suites, utils,
};

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt::writer::MakeWriterExt, EnvFilter};

use std::process::ExitCode;

// Warnings and errors go to stderr, progress to stdout.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "hpcbench=debug"
    } else {
        "hpcbench=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr.with_max_level(Level::WARN).or_else(std::io::stdout))
        .init();
}

fn build_suite(command: &SuiteCmd) -> Result<Suite, BenchError> {
    let suite = match command {
        SuiteCmd::Dense(_) => suites::dense_suite()?,
        SuiteCmd::Sparse(_) => suites::sparse_suite()?,
        SuiteCmd::Clustering(_) => suites::clustering_suite()?,
        SuiteCmd::All(_) => suites::all_suites()?,
        SuiteCmd::Suite { file, .. } | SuiteCmd::List { file: Some(file) } => {
            config::load_suite(file)?
        }
        SuiteCmd::List { file: None } => suites::all_suites()?,
    };
    Ok(suite)
}

fn list(suite: &Suite) {
    for def in suite.definitions() {
        let status = if def.active { "active" } else { "inactive" };
        match &def.data_source {
            Some(source) => println!("{} ({}, {status}, dataset `{source}`)", def.name, def.kind()),
            None => println!("{} ({}, {status})", def.name, def.kind()),
        }
        if !def.description.is_empty() {
            println!("    {}", def.description);
        }
        if def.validate().is_err() {
            println!("    invalid: sequence lengths differ");
            continue;
        }
        for j in 0..def.sizes.len() {
            println!(
                "    {}  trials={} warmups={}",
                def.sizes.fields(j),
                def.trial_counts[j],
                def.warmup_counts[j]
            );
        }
    }
}

fn run(args: CliArgs) -> Result<(), BenchError> {
    let suite = build_suite(&args.command)?;
    let Some(run) = args.command.run_args() else {
        list(&suite);
        return Ok(());
    };

    let thread_count = utils::thread_count_from_env()?;
    let suite = if run.only.is_empty() {
        suite
    } else {
        suite.select(&run.only)?
    };

    let settings = RunSettings {
        thread_count,
        output_dir: run.output_dir.clone(),
        run_tag: run.run_tag.clone(),
        seed: run.seed,
    };
    let loader = DataDirLoader::with_bundled(run.data_dir.clone());

    info!(
        threads = thread_count,
        run_tag = %settings.run_tag,
        "running {} benchmark definition(s)",
        suite.len()
    );
    let Some(table) =
        drivers::run_suite(suite.definitions(), &MicrobenchmarkRunner, &loader, &settings)?
    else {
        return Ok(());
    };
    info!("collected {} trial record(s)", table.len());

    if let Some(path) = &run.raw_output {
        table.write_csv(path)?;
        info!("raw results written to {}", path.display());
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
