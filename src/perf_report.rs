//! Benchmark result records and their persistence.
//!
//! This module defines the two kinds of results produced by a microbenchmark:
//! - one [`TrialRecord`] per successful measured trial, gathered in memory in a
//!   [`RawResultsTable`];
//! - one [`SummaryRecord`] per problem size, appended to a CSV file on disk as soon as the
//!   problem size is done.
//!
//! Summary files are opened, appended to and closed on every write, so a run interrupted after
//! some problem size keeps every row written before it.

use crate::{definition::SizeFields, error::RecordError};

use chrono::{DateTime, Local};

use std::{
    fmt,
    fs::OpenOptions,
    path::{Path, PathBuf},
};

/// Timings of one successful measured trial.
#[derive(Clone, Debug, PartialEq)]
pub struct TrialRecord {
    /// Name of the benchmark definition.
    pub name: String,
    pub sizes: SizeFields,
    /// User CPU time in seconds.
    pub user_time: f64,
    /// System CPU time in seconds.
    pub system_time: f64,
    /// Wall-clock time in seconds.
    pub wall_time: f64,
    pub date_started: DateTime<Local>,
    pub date_finished: DateTime<Local>,
}

/// Aggregated wall-clock timings of one problem size.
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryRecord {
    /// Reported thread count.
    pub num_threads: u32,
    pub sizes: SizeFields,
    /// Average wall-clock time in seconds, NaN if no measured trial succeeded.
    pub avg_wall_time: f64,
    /// Sample standard deviation, NaN if fewer than two measured trials succeeded.
    pub std_dev_wall_time: f64,
}

impl SummaryRecord {
    pub fn csv_header(&self) -> Vec<&'static str> {
        let mut header = vec!["num_threads"];
        header.extend_from_slice(self.sizes.header());
        header.extend(["avg_wall_time", "std_dev_wall_time"]);
        header
    }

    pub fn csv_fields(&self) -> Vec<String> {
        let mut fields = vec![self.num_threads.to_string()];
        fields.extend(self.sizes.values().iter().map(usize::to_string));
        fields.push(self.avg_wall_time.to_string());
        fields.push(self.std_dev_wall_time.to_string());
        fields
    }
}

impl fmt::Display for SummaryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, avg {:.6} s, stddev {:.6} s",
            self.sizes, self.avg_wall_time, self.std_dev_wall_time
        )
    }
}

/// Path of the summary file of a definition for a given run.
pub fn summary_file_path(output_dir: &Path, name: &str, run_tag: &str) -> PathBuf {
    output_dir.join(format!("{name}_{run_tag}.csv"))
}

/// Appends `record` to the CSV file at `path`, writing the header first if the file is missing
/// or empty.
pub fn write_summary_row(record: &SummaryRecord, path: &Path) -> Result<(), RecordError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let write_header = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if write_header {
        writer.write_record(record.csv_header())?;
    }
    writer.write_record(record.csv_fields())?;
    writer.flush()?;

    Ok(())
}

/// In-memory table of every successful measured trial, in execution order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawResultsTable {
    rows: Vec<TrialRecord>,
}

impl RawResultsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: TrialRecord) {
        self.rows.push(record);
    }

    /// Moves every row of `other` to the end of this table.
    pub fn append(&mut self, other: &mut RawResultsTable) {
        self.rows.append(&mut other.rows);
    }

    pub fn rows(&self) -> &[TrialRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes the table to `path` as CSV, truncating any previous content.
    ///
    /// Definitions of different kinds may share a table, so the size fields are written as a
    /// single `key=value` column.
    pub fn write_csv(&self, path: &Path) -> Result<(), RecordError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record([
            "name",
            "sizes",
            "user_time",
            "system_time",
            "wall_time",
            "date_started",
            "date_finished",
        ])?;
        for row in &self.rows {
            writer.write_record([
                row.name.clone(),
                row.sizes.to_string(),
                row.user_time.to_string(),
                row.system_time.to_string(),
                row.wall_time.to_string(),
                row.date_started.to_rfc3339(),
                row.date_finished.to_rfc3339(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}
