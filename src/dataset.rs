//! Shared datasets.
//!
//! A definition naming a data source gets that dataset loaded once before its first trial and
//! dropped right after its last one. The orchestrator hands the loaded dataset to the runner,
//! which passes it to the allocator through [`crate::definition::AllocContext`].
//!
//! Datasets are sparse matrices stored in the [Matrix Market][1] coordinate format, in files
//! named `<name>.mtx`.
//!
//! [1]: https://math.nist.gov/MatrixMarket/formats.html

use crate::{consts, error::DatasetError, kernels::CsrMatrix};

use tracing::debug;

use std::{
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    sync::Arc,
};

/// A dataset loaded for the duration of one definition.
#[derive(Clone, Debug)]
pub enum SharedDataset {
    SparseMatrix(Arc<CsrMatrix<f64>>),
}

/// Loads named datasets.
pub trait DatasetLoader {
    fn load(&self, name: &str) -> Result<SharedDataset, DatasetError>;
}

/// Looks datasets up in a list of directories, in order.
#[derive(Clone, Debug)]
pub struct DataDirLoader {
    search_dirs: Vec<PathBuf>,
}

impl DataDirLoader {
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }

    /// Searches `data_dir` first, then the `data` directory bundled with the crate.
    pub fn with_bundled(data_dir: impl Into<PathBuf>) -> Self {
        Self::new(vec![
            data_dir.into(),
            Path::new(env!("CARGO_MANIFEST_DIR")).join(consts::DEFAULT_DATA_DIR),
        ])
    }

    fn locate(&self, name: &str) -> Result<PathBuf, DatasetError> {
        let file_name = format!("{name}.{}", consts::DATASET_EXTENSION);
        let candidates: Vec<PathBuf> = self
            .search_dirs
            .iter()
            .map(|dir| dir.join(&file_name))
            .collect();

        match candidates.iter().find(|p| p.is_file()) {
            Some(path) => Ok(path.clone()),
            None => Err(DatasetError::NotFound {
                name: name.to_string(),
                searched: candidates,
            }),
        }
    }
}

impl DatasetLoader for DataDirLoader {
    fn load(&self, name: &str) -> Result<SharedDataset, DatasetError> {
        let path = self.locate(name)?;
        debug!(dataset = name, path = %path.display(), "loading dataset");

        let file = fs::File::open(&path).map_err(|source| DatasetError::Io {
            path: path.clone(),
            source,
        })?;
        let matrix = read_matrix_market(BufReader::new(file)).map_err(|e| match e {
            DatasetError::Io { source, .. } => DatasetError::Io { path, source },
            other => other,
        })?;

        Ok(SharedDataset::SparseMatrix(Arc::new(matrix)))
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Real,
    Pattern,
}

#[derive(Clone, Copy, PartialEq)]
enum Symmetry {
    General,
    Symmetric,
    SkewSymmetric,
}

/// Parses a Matrix Market coordinate file (`real`, `integer` or `pattern` entries; `general`,
/// `symmetric` or `skew-symmetric` storage). Symmetric entries are expanded to both triangles.
pub fn read_matrix_market<R: BufRead>(reader: R) -> Result<CsrMatrix<f64>, DatasetError> {
    let parse_err = |line: usize, message: String| DatasetError::Parse { line, message };

    let mut lines = reader.lines().enumerate().map(|(i, l)| (i + 1, l));
    let mut next_line = || -> Result<Option<(usize, String)>, DatasetError> {
        match lines.next() {
            Some((n, Ok(l))) => Ok(Some((n, l))),
            Some((_, Err(source))) => Err(DatasetError::Io {
                path: PathBuf::new(),
                source,
            }),
            None => Ok(None),
        }
    };

    let (_, banner) = next_line()?.ok_or_else(|| parse_err(1, "empty file".into()))?;
    let tokens: Vec<String> = banner
        .split_whitespace()
        .map(str::to_ascii_lowercase)
        .collect();
    if tokens.len() != 5 || tokens[0] != "%%matrixmarket" || tokens[1] != "matrix" {
        return Err(parse_err(1, format!("bad banner `{banner}`")));
    }
    if tokens[2] != "coordinate" {
        return Err(parse_err(1, format!("unsupported format `{}`", tokens[2])));
    }
    let field = match tokens[3].as_str() {
        "real" | "integer" => Field::Real,
        "pattern" => Field::Pattern,
        other => return Err(parse_err(1, format!("unsupported field `{other}`"))),
    };
    let symmetry = match tokens[4].as_str() {
        "general" => Symmetry::General,
        "symmetric" => Symmetry::Symmetric,
        "skew-symmetric" => Symmetry::SkewSymmetric,
        other => return Err(parse_err(1, format!("unsupported symmetry `{other}`"))),
    };

    // Size line, after any comment.
    let (size_line_no, size_line) = loop {
        match next_line()? {
            Some((_, l)) if l.trim().is_empty() || l.starts_with('%') => continue,
            Some(found) => break found,
            None => return Err(parse_err(1, "missing size line".into())),
        }
    };
    let dims: Vec<usize> = size_line
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|e| parse_err(size_line_no, format!("bad size line: {e}")))?;
    let &[rows, cols, entries] = dims.as_slice() else {
        return Err(parse_err(size_line_no, "size line needs 3 integers".into()));
    };

    let mut triplets = Vec::with_capacity(match symmetry {
        Symmetry::General => entries,
        _ => 2 * entries,
    });
    let mut seen = 0;
    while let Some((line_no, line)) = next_line()? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        let mut it = line.split_whitespace();
        let mut index = |what: &str| -> Result<usize, DatasetError> {
            it.next()
                .ok_or_else(|| parse_err(line_no, format!("missing {what}")))?
                .parse::<usize>()
                .map_err(|e| parse_err(line_no, format!("bad {what}: {e}")))
        };
        let (i, j) = (index("row index")?, index("column index")?);
        if i == 0 || i > rows || j == 0 || j > cols {
            return Err(parse_err(
                line_no,
                format!("entry ({i}, {j}) outside {rows}x{cols}"),
            ));
        }
        let value = match field {
            Field::Pattern => 1.0,
            Field::Real => it
                .next()
                .ok_or_else(|| parse_err(line_no, "missing value".into()))?
                .parse::<f64>()
                .map_err(|e| parse_err(line_no, format!("bad value: {e}")))?,
        };

        let (r, c) = (i - 1, j - 1);
        triplets.push((r, c, value));
        if r != c {
            match symmetry {
                Symmetry::General => {}
                Symmetry::Symmetric => triplets.push((c, r, value)),
                Symmetry::SkewSymmetric => triplets.push((c, r, -value)),
            }
        }
        seen += 1;
    }

    if seen != entries {
        return Err(parse_err(
            size_line_no,
            format!("expected {entries} entries, found {seen}"),
        ));
    }

    Ok(CsrMatrix::from_triplets(rows, cols, triplets))
}
