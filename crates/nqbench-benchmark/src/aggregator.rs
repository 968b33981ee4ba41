//! Result aggregator: one record per matrix cell, never a silent gap.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use nqbench_core::{TrialResult, TrialSpec, TrialStatus};
use tracing::warn;

use crate::error::{HarnessError, RecordError};
use crate::matrix::TrialMatrix;
use crate::report::CsvExporter;

/// Detail given to cells that never received a result.
pub const NEVER_RECORDED: &str = "trial never recorded";

/// Accumulates trial results keyed by (target, size, workers).
///
/// # Example
///
/// ```
/// use nqbench_benchmark::{Aggregator, TrialMatrix};
/// use nqbench_core::{Target, TrialResult, TrialSpec, TrialStatus};
///
/// let targets = [Target::new("cudd", "C", "./cudd {size}")];
/// let matrix = TrialMatrix::new(&targets, &[4, 5], &[0]).unwrap();
/// let mut agg = Aggregator::new(&matrix);
///
/// agg.record(TrialResult::new(TrialSpec::new("cudd", 4, 0), TrialStatus::Success)).unwrap();
/// let set = agg.finalize();
///
/// assert_eq!(set.len(), 2);
/// assert_eq!(set.rows()[1].status, TrialStatus::RunFailure);
/// ```
#[derive(Debug)]
pub struct Aggregator {
    specs: Vec<TrialSpec>,
    index: HashMap<TrialSpec, usize>,
    rows: Vec<Option<TrialResult>>,
    journal: Option<Journal>,
}

impl Aggregator {
    pub fn new(matrix: &TrialMatrix) -> Self {
        let specs = matrix.specs().to_vec();
        let index = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.clone(), i))
            .collect();
        Self {
            rows: vec![None; specs.len()],
            specs,
            index,
            journal: None,
        }
    }

    /// Appends every recorded row to `path` as it arrives.
    ///
    /// # Errors
    ///
    /// Fails when the journal file cannot be created.
    pub fn with_journal(mut self, path: impl Into<PathBuf>) -> Result<Self, HarnessError> {
        self.journal = Some(Journal::create(path.into())?);
        Ok(self)
    }

    /// Records the terminal result of one trial.
    ///
    /// # Errors
    ///
    /// Rejects a key outside the matrix or one that was already recorded.
    pub fn record(&mut self, result: TrialResult) -> Result<(), RecordError> {
        let Some(&i) = self.index.get(&result.spec) else {
            return Err(RecordError::Unknown(result.spec));
        };
        if self.rows[i].is_some() {
            return Err(RecordError::Duplicate(result.spec));
        }
        let failed = match &mut self.journal {
            Some(journal) => journal
                .append(&result)
                .err()
                .map(|e| (journal.path.clone(), e)),
            None => None,
        };
        if let Some((path, e)) = failed {
            warn!(event = "journal_error", path = %path.display(), error = %e);
            self.journal = None;
        }
        self.rows[i] = Some(result);
        Ok(())
    }

    pub fn is_recorded(&self, spec: &TrialSpec) -> bool {
        self.index
            .get(spec)
            .is_some_and(|&i| self.rows[i].is_some())
    }

    pub fn recorded(&self) -> usize {
        self.rows.iter().filter(|r| r.is_some()).count()
    }

    pub fn expected(&self) -> usize {
        self.specs.len()
    }

    /// Closes the set, filling unrecorded cells with a run failure.
    pub fn finalize(self) -> ResultSet {
        let rows = self
            .specs
            .into_iter()
            .zip(self.rows)
            .map(|(spec, row)| {
                row.unwrap_or_else(|| {
                    TrialResult::new(spec, TrialStatus::RunFailure).with_error(NEVER_RECORDED)
                })
            })
            .collect();
        ResultSet { rows }
    }
}

#[derive(Debug)]
struct Journal {
    path: PathBuf,
    file: File,
}

impl Journal {
    fn create(path: PathBuf) -> Result<Self, HarnessError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| HarnessError::io(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| HarnessError::io(&path, e))?;
        writeln!(file, "{}", CsvExporter::HEADER).map_err(|e| HarnessError::io(&path, e))?;
        Ok(Self { path, file })
    }

    fn append(&mut self, result: &TrialResult) -> std::io::Result<()> {
        writeln!(self.file, "{}", CsvExporter::row(result))?;
        self.file.flush()
    }
}

/// Path of the incremental journal kept next to `output`.
pub fn journal_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

/// Finalized results, one row per matrix cell, in matrix order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    rows: Vec<TrialResult>,
}

impl ResultSet {
    pub fn rows(&self) -> &[TrialResult] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrialResult> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Looks up a row by key.
    pub fn get(&self, target: &str, size: u32, workers: u32) -> Option<&TrialResult> {
        self.rows
            .iter()
            .find(|r| r.spec.key() == (target, size, workers))
    }

    /// Row count per status, in [`TrialStatus::ALL`] order.
    pub fn status_counts(&self) -> Vec<(TrialStatus, usize)> {
        TrialStatus::ALL
            .iter()
            .map(|&status| {
                let n = self.rows.iter().filter(|r| r.status == status).count();
                (status, n)
            })
            .collect()
    }

    pub fn successes(&self) -> usize {
        self.rows.iter().filter(|r| r.status.is_success()).count()
    }
}
