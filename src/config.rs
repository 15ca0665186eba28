//! Suite files.
//!
//! Suites can be described in [TOML][1] files, deserialized with [`serde`][2]. Each
//! `[[benchmark]]` table names one of the built-in kernels and gives the size sequences of its
//! kind:
//!
//! ```toml
//! [[benchmark]]
//! name = "spmv_small"
//! kernel = "spmv"
//! description = "SpMV on small random matrices"
//! rows = [1000, 2000]
//! cols = [1000, 2000]
//! nonzeros = [10000, 20000]
//! trials = [10, 10]
//! warmups = [1, 1]
//!
//! [[benchmark]]
//! name = "gemm"
//! kernel = "matmat"
//! active = false
//! dims = [512]
//! trials = [5]
//! warmups = [1]
//! ```
//!
//! Sequence lengths are not checked here: a definition with mismatched lengths is rejected by
//! the runner, without affecting the rest of the suite.
//!
//! [1]: https://toml.io
//! [2]: https://crates.io/crates/serde

use crate::{
    definition::{BenchmarkDefinition, KernelKind, ProblemSizes, Suite},
    error::{BenchError, ConfigError},
    kernels,
};

use serde::Deserialize;

use std::{fs, path::Path};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SuiteFile {
    #[serde(default, rename = "benchmark")]
    benchmarks: Vec<BenchmarkEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BenchmarkEntry {
    name: String,
    kernel: String,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default)]
    description: String,
    data_source: Option<String>,
    dims: Option<Vec<usize>>,
    rows: Option<Vec<usize>>,
    cols: Option<Vec<usize>>,
    nonzeros: Option<Vec<usize>>,
    features: Option<Vec<usize>>,
    clusters: Option<Vec<usize>>,
    vectors_per_cluster: Option<Vec<usize>>,
    trials: Vec<u32>,
    warmups: Vec<u32>,
}

fn default_active() -> bool {
    true
}

impl BenchmarkEntry {
    fn into_definition(self) -> Result<BenchmarkDefinition, ConfigError> {
        let Some(entry) = kernels::lookup(&self.kernel) else {
            return Err(ConfigError::UnknownKernel {
                name: self.name,
                kernel: self.kernel,
                known: kernels::KERNEL_NAMES.join(", "),
            });
        };

        let Self {
            name,
            kernel,
            active,
            description,
            data_source,
            dims,
            rows,
            cols,
            nonzeros,
            features,
            clusters,
            vectors_per_cluster,
            trials,
            warmups,
        } = self;

        let fields = [
            ("dims", KernelKind::Dense, dims.is_some()),
            ("rows", KernelKind::Sparse, rows.is_some()),
            ("cols", KernelKind::Sparse, cols.is_some()),
            ("nonzeros", KernelKind::Sparse, nonzeros.is_some()),
            ("features", KernelKind::Clustering, features.is_some()),
            ("clusters", KernelKind::Clustering, clusters.is_some()),
            ("vectors_per_cluster", KernelKind::Clustering, vectors_per_cluster.is_some()),
        ];
        if let Some((field, _, _)) = fields
            .iter()
            .find(|(_, kind, present)| *present && *kind != entry.kind)
        {
            return Err(ConfigError::KindMismatch {
                name,
                message: format!("`{field}` does not apply to {} kernel `{kernel}`", entry.kind),
            });
        }

        let required = |field: &str, seq: Option<Vec<usize>>| {
            seq.ok_or_else(|| ConfigError::KindMismatch {
                name: name.clone(),
                message: format!("{} kernel `{kernel}` needs `{field}`", entry.kind),
            })
        };
        let sizes = match entry.kind {
            KernelKind::Dense => ProblemSizes::Dense {
                dims: required("dims", dims)?,
            },
            KernelKind::Sparse => ProblemSizes::Sparse {
                rows: required("rows", rows)?,
                cols: required("cols", cols)?,
                nonzeros: required("nonzeros", nonzeros)?,
            },
            KernelKind::Clustering => ProblemSizes::Clustering {
                features: required("features", features)?,
                clusters: required("clusters", clusters)?,
                vectors_per_cluster: required("vectors_per_cluster", vectors_per_cluster)?,
            },
        };

        let mut def = BenchmarkDefinition::new(name, sizes)
            .active(active)
            .description(description)
            .trials(trials, warmups)
            .allocator(entry.allocator)
            .kernel(entry.kernel);
        if let Some(source) = data_source {
            def = def.data_source(source);
        }
        Ok(def)
    }
}

/// Parses the content of a suite file. `path` is only used in error messages.
pub fn parse_suite(text: &str, path: &Path) -> Result<Suite, ConfigError> {
    let file: SuiteFile = toml::from_str(text).map_err(|source| ConfigError::SuiteFile {
        path: path.to_path_buf(),
        source,
    })?;

    let definitions = file
        .benchmarks
        .into_iter()
        .map(BenchmarkEntry::into_definition)
        .collect::<Result<Vec<_>, _>>()?;
    Suite::new(definitions)
}

/// Reads and parses a suite file.
pub fn load_suite(path: &Path) -> Result<Suite, BenchError> {
    let text = fs::read_to_string(path)?;
    Ok(parse_suite(&text, path)?)
}
