//! Benchmark definitions.
//!
//! A [`BenchmarkDefinition`] is a declarative record describing one microbenchmark: which
//! problem sizes to test, how many warm-up and measured trials to run for each, and the two
//! capabilities the engine invokes (an [`Allocator`] producing the input of a trial and a
//! [`KernelOperation`] timing the operation on it). The engine never looks at what a kernel
//! does; it only calls the stored capabilities.

use crate::{
    dataset::SharedDataset,
    error::{AllocationError, ConfigError, KernelError},
    kernels::TrialInput,
    timing::KernelTimings,
};

use rand::rngs::SmallRng;

use std::{collections::HashMap, fmt, sync::Arc};

/// Kind of kernel a definition benchmarks. It decides which size parameters are carried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelKind {
    Dense,
    Sparse,
    Clustering,
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dense => write!(f, "dense"),
            Self::Sparse => write!(f, "sparse"),
            Self::Clustering => write!(f, "clustering"),
        }
    }
}

/// Parallel sequences describing the problem instances of a definition.
#[derive(Clone, Debug, PartialEq)]
pub enum ProblemSizes {
    /// Square matrices of order `N`.
    Dense { dims: Vec<usize> },
    /// Sparse matrices with the given shape and number of stored entries.
    Sparse {
        rows: Vec<usize>,
        cols: Vec<usize>,
        nonzeros: Vec<usize>,
    },
    /// Synthetic cluster data.
    Clustering {
        features: Vec<usize>,
        clusters: Vec<usize>,
        vectors_per_cluster: Vec<usize>,
    },
}

impl ProblemSizes {
    pub fn kind(&self) -> KernelKind {
        match self {
            Self::Dense { .. } => KernelKind::Dense,
            Self::Sparse { .. } => KernelKind::Sparse,
            Self::Clustering { .. } => KernelKind::Clustering,
        }
    }

    /// Named sequences, in declaration order.
    fn sequences(&self) -> Vec<(&'static str, &[usize])> {
        match self {
            Self::Dense { dims } => vec![("dims", dims.as_slice())],
            Self::Sparse {
                rows,
                cols,
                nonzeros,
            } => vec![
                ("rows", rows.as_slice()),
                ("cols", cols.as_slice()),
                ("nonzeros", nonzeros.as_slice()),
            ],
            Self::Clustering {
                features,
                clusters,
                vectors_per_cluster,
            } => vec![
                ("features", features.as_slice()),
                ("clusters", clusters.as_slice()),
                ("vectors_per_cluster", vectors_per_cluster.as_slice()),
            ],
        }
    }

    /// Number of problem sizes, i.e. the length of the first sequence.
    pub fn len(&self) -> usize {
        self.sequences()[0].1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size fields of the problem size at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds for any of the sequences; the runner only calls this
    /// after validating the definition.
    pub fn fields(&self, index: usize) -> SizeFields {
        match self {
            Self::Dense { dims } => SizeFields::Dense { n: dims[index] },
            Self::Sparse {
                rows,
                cols,
                nonzeros,
            } => SizeFields::Sparse {
                rows: rows[index],
                cols: cols[index],
                nonzeros: nonzeros[index],
            },
            Self::Clustering {
                features,
                clusters,
                vectors_per_cluster,
            } => SizeFields::Clustering {
                features: features[index],
                clusters: clusters[index],
                vectors_per_cluster: vectors_per_cluster[index],
            },
        }
    }
}

/// Size-describing fields of a single problem instance, as reported in the result files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeFields {
    Dense {
        n: usize,
    },
    Sparse {
        rows: usize,
        cols: usize,
        nonzeros: usize,
    },
    Clustering {
        features: usize,
        clusters: usize,
        vectors_per_cluster: usize,
    },
}

impl SizeFields {
    /// CSV column names of the size fields.
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            Self::Dense { .. } => &["n"],
            Self::Sparse { .. } => &["num_rows", "num_cols", "num_nonzeros"],
            Self::Clustering { .. } => &["num_features", "num_clusters", "num_vectors_per_cluster"],
        }
    }

    /// Values of the size fields, in the order of [`SizeFields::header`].
    pub fn values(&self) -> Vec<usize> {
        match *self {
            Self::Dense { n } => vec![n],
            Self::Sparse {
                rows,
                cols,
                nonzeros,
            } => vec![rows, cols, nonzeros],
            Self::Clustering {
                features,
                clusters,
                vectors_per_cluster,
            } => vec![features, clusters, vectors_per_cluster],
        }
    }
}

impl fmt::Display for SizeFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .header()
            .iter()
            .zip(self.values())
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        write!(f, "{}", pairs.join(" "))
    }
}

/// State handed to an allocator for one trial.
pub struct AllocContext<'a> {
    /// Generator reset to the run's fixed seed right before the allocator is called.
    pub rng: SmallRng,
    /// Dataset loaded once for the whole definition, if it names a data source.
    pub dataset: Option<&'a SharedDataset>,
}

/// Produces the input of a single trial.
pub trait Allocator: Send + Sync {
    fn allocate(
        &self,
        definition: &BenchmarkDefinition,
        size_index: usize,
        ctx: &mut AllocContext<'_>,
    ) -> Result<TrialInput, AllocationError>;
}

impl<F> Allocator for F
where
    F: Fn(&BenchmarkDefinition, usize, &mut AllocContext<'_>) -> Result<TrialInput, AllocationError>
        + Send
        + Sync,
{
    fn allocate(
        &self,
        definition: &BenchmarkDefinition,
        size_index: usize,
        ctx: &mut AllocContext<'_>,
    ) -> Result<TrialInput, AllocationError> {
        self(definition, size_index, ctx)
    }
}

/// Performs and times the benchmarked operation on an allocated input.
pub trait KernelOperation: Send + Sync {
    fn run(
        &self,
        definition: &BenchmarkDefinition,
        input: &mut TrialInput,
    ) -> Result<KernelTimings, KernelError>;
}

impl<F> KernelOperation for F
where
    F: Fn(&BenchmarkDefinition, &mut TrialInput) -> Result<KernelTimings, KernelError>
        + Send
        + Sync,
{
    fn run(
        &self,
        definition: &BenchmarkDefinition,
        input: &mut TrialInput,
    ) -> Result<KernelTimings, KernelError> {
        self(definition, input)
    }
}

/// Declarative description of one microbenchmark.
#[derive(Clone)]
pub struct BenchmarkDefinition {
    /// Whether the orchestrator executes this definition.
    pub active: bool,
    /// Unique name within a suite, also the base of the output file names.
    pub name: String,
    pub description: String,
    /// Named dataset loaded once and shared by every trial.
    pub data_source: Option<String>,
    pub sizes: ProblemSizes,
    /// Measured trials per problem size.
    pub trial_counts: Vec<u32>,
    /// Discarded warm-up trials per problem size.
    pub warmup_counts: Vec<u32>,
    pub allocator: Option<Arc<dyn Allocator>>,
    pub kernel: Option<Arc<dyn KernelOperation>>,
}

impl BenchmarkDefinition {
    /// Creates an active definition with no trials and no capabilities attached.
    pub fn new(name: impl Into<String>, sizes: ProblemSizes) -> Self {
        Self {
            active: true,
            name: name.into(),
            description: String::new(),
            data_source: None,
            sizes,
            trial_counts: Vec::new(),
            warmup_counts: Vec::new(),
            allocator: None,
            kernel: None,
        }
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn data_source(mut self, name: impl Into<String>) -> Self {
        self.data_source = Some(name.into());
        self
    }

    pub fn trials(mut self, trial_counts: Vec<u32>, warmup_counts: Vec<u32>) -> Self {
        self.trial_counts = trial_counts;
        self.warmup_counts = warmup_counts;
        self
    }

    pub fn allocator(mut self, allocator: Arc<dyn Allocator>) -> Self {
        self.allocator = Some(allocator);
        self
    }

    pub fn kernel(mut self, kernel: Arc<dyn KernelOperation>) -> Self {
        self.kernel = Some(kernel);
        self
    }

    /// Attaches a closure as the allocator.
    pub fn allocate_with<F>(self, f: F) -> Self
    where
        F: Fn(&BenchmarkDefinition, usize, &mut AllocContext<'_>) -> Result<TrialInput, AllocationError>
            + Send
            + Sync
            + 'static,
    {
        self.allocator(Arc::new(f))
    }

    /// Attaches a closure as the kernel operation.
    pub fn run_with<F>(self, f: F) -> Self
    where
        F: Fn(&BenchmarkDefinition, &mut TrialInput) -> Result<KernelTimings, KernelError>
            + Send
            + Sync
            + 'static,
    {
        self.kernel(Arc::new(f))
    }

    pub fn kind(&self) -> KernelKind {
        self.sizes.kind()
    }

    /// Checks that both capabilities are present and that every parallel sequence has the same
    /// length. Returns the number of problem sizes.
    pub fn validate(&self) -> Result<usize, ConfigError> {
        if self.allocator.is_none() {
            return Err(ConfigError::MissingCapability {
                name: self.name.clone(),
                capability: "allocator",
            });
        }
        if self.kernel.is_none() {
            return Err(ConfigError::MissingCapability {
                name: self.name.clone(),
                capability: "kernel operation",
            });
        }

        let expected = self.sizes.len();
        let counts = [
            ("trial_counts", self.trial_counts.len()),
            ("warmup_counts", self.warmup_counts.len()),
        ];
        let lengths = self
            .sizes
            .sequences()
            .into_iter()
            .map(|(field, seq)| (field, seq.len()))
            .chain(counts);
        for (field, actual) in lengths {
            if actual != expected {
                return Err(ConfigError::LengthMismatch {
                    name: self.name.clone(),
                    field,
                    expected,
                    actual,
                });
            }
        }

        Ok(expected)
    }
}

impl fmt::Debug for BenchmarkDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BenchmarkDefinition")
            .field("active", &self.active)
            .field("name", &self.name)
            .field("data_source", &self.data_source)
            .field("sizes", &self.sizes)
            .field("trial_counts", &self.trial_counts)
            .field("warmup_counts", &self.warmup_counts)
            .field("allocator", &self.allocator.is_some())
            .field("kernel", &self.kernel.is_some())
            .finish()
    }
}

/// Ordered collection of definitions with unique names.
#[derive(Clone, Debug, Default)]
pub struct Suite {
    definitions: Vec<BenchmarkDefinition>,
    index: HashMap<String, usize>,
}

impl Suite {
    /// Builds a suite, rejecting duplicate names.
    pub fn new(definitions: Vec<BenchmarkDefinition>) -> Result<Self, ConfigError> {
        let mut index = HashMap::with_capacity(definitions.len());
        for (i, def) in definitions.iter().enumerate() {
            if index.insert(def.name.clone(), i).is_some() {
                return Err(ConfigError::DuplicateName(def.name.clone()));
            }
        }
        Ok(Self { definitions, index })
    }

    pub fn definitions(&self) -> &[BenchmarkDefinition] {
        &self.definitions
    }

    pub fn get(&self, name: &str) -> Option<&BenchmarkDefinition> {
        self.index.get(name).map(|&i| &self.definitions[i])
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Appends the definitions of `other`, keeping names unique.
    pub fn extend(&mut self, other: Suite) -> Result<(), ConfigError> {
        for def in other.definitions {
            if self.index.contains_key(&def.name) {
                return Err(ConfigError::DuplicateName(def.name));
            }
            self.index.insert(def.name.clone(), self.definitions.len());
            self.definitions.push(def);
        }
        Ok(())
    }

    /// Keeps the named definitions only, in suite order, and forces them active.
    pub fn select(&self, names: &[String]) -> Result<Suite, ConfigError> {
        if let Some(missing) = names.iter().find(|n| self.get(n).is_none()) {
            return Err(ConfigError::UnknownBenchmark(missing.clone()));
        }
        let selected = self
            .definitions
            .iter()
            .filter(|def| names.contains(&def.name))
            .cloned()
            .map(|def| def.active(true))
            .collect();
        Suite::new(selected)
    }
}
