//! The (size, target, workers) trial matrix.

use nqbench_core::{Target, TrialSpec};

use crate::error::HarnessError;

/// Ordered Cartesian product of sizes, targets and worker settings.
///
/// Sizes vary slowest, then targets, then workers, so every target runs a
/// size before any target moves to the next one. Repeated sizes, targets or
/// worker settings are collapsed to their first occurrence.
///
/// # Example
///
/// ```
/// use nqbench_benchmark::TrialMatrix;
/// use nqbench_core::Target;
///
/// let targets = [Target::new("a", "C", "./a {size}"), Target::new("b", "C", "./b {size}")];
/// let matrix = TrialMatrix::new(&targets, &[4, 5, 4], &[0]).unwrap();
///
/// assert_eq!(matrix.len(), 4);
/// assert_eq!(matrix.specs()[1].key(), ("b", 4, 0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialMatrix {
    specs: Vec<TrialSpec>,
    // Position in the constructor's target slice, parallel to `specs`.
    target_index: Vec<usize>,
    sizes: Vec<u32>,
    workers: Vec<u32>,
}

impl TrialMatrix {
    /// # Errors
    ///
    /// Returns [`HarnessError::EmptyMatrix`] when any dimension is empty.
    pub fn new(targets: &[Target], sizes: &[u32], workers: &[u32]) -> Result<Self, HarnessError> {
        let sizes = first_occurrences(sizes);
        let workers = first_occurrences(workers);
        let mut ids: Vec<(usize, &str)> = Vec::with_capacity(targets.len());
        for (index, target) in targets.iter().enumerate() {
            if !ids.iter().any(|&(_, id)| id == target.id) {
                ids.push((index, &target.id));
            }
        }

        if ids.is_empty() {
            return Err(HarnessError::EmptyMatrix("no targets selected"));
        }
        if sizes.is_empty() {
            return Err(HarnessError::EmptyMatrix("no board sizes requested"));
        }
        if workers.is_empty() {
            return Err(HarnessError::EmptyMatrix("no worker settings requested"));
        }

        let cells = ids.len() * sizes.len() * workers.len();
        let mut specs = Vec::with_capacity(cells);
        let mut target_index = Vec::with_capacity(cells);
        for &size in &sizes {
            for &(index, id) in &ids {
                for &w in &workers {
                    specs.push(TrialSpec::new(id, size, w));
                    target_index.push(index);
                }
            }
        }
        Ok(Self {
            specs,
            target_index,
            sizes,
            workers,
        })
    }

    pub fn specs(&self) -> &[TrialSpec] {
        &self.specs
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrialSpec> {
        self.specs.iter()
    }

    /// Every cell with the position of its target in the slice the matrix
    /// was built from.
    pub fn cells(&self) -> impl Iterator<Item = (usize, &TrialSpec)> {
        self.target_index.iter().copied().zip(&self.specs)
    }

    /// Distinct sizes in request order.
    pub fn sizes(&self) -> &[u32] {
        &self.sizes
    }

    /// Distinct worker settings in request order.
    pub fn workers(&self) -> &[u32] {
        &self.workers
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

fn first_occurrences(values: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(values.len());
    for &v in values {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}
