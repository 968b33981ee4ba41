//! Node-count consistency across targets.
//!
//! Targets that build the same diagram family under the same variable
//! ordering must agree on the node count for a board size. Counts are only
//! compared inside such groups; other groups are listed for reference.

use std::collections::BTreeMap;

use nqbench_core::{DiagramFamily, NodeSource, Target, VariableOrdering};

use crate::aggregator::ResultSet;

/// One successful count inside a group.
#[derive(Debug, Clone, PartialEq)]
pub struct CountEntry {
    pub target: String,
    pub workers: u32,
    pub node_count: u64,
    pub source: Option<NodeSource>,
}

/// Counts sharing a size, family and ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyGroup {
    pub size: u32,
    pub family: DiagramFamily,
    pub ordering: VariableOrdering,
    pub entries: Vec<CountEntry>,
    /// `(max - min) / max` over the entries.
    pub spread: f64,
    pub consistent: bool,
}

impl ConsistencyGroup {
    /// Distinct targets in the group.
    pub fn target_count(&self) -> usize {
        let mut ids: Vec<&str> = self.entries.iter().map(|e| e.target.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }
}

/// Outcome of a [`NodeCountCheck`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsistencyReport {
    pub groups: Vec<ConsistencyGroup>,
    pub tolerance: f64,
}

impl ConsistencyReport {
    pub fn mismatches(&self) -> impl Iterator<Item = &ConsistencyGroup> {
        self.groups.iter().filter(|g| !g.consistent)
    }

    pub fn is_consistent(&self) -> bool {
        self.groups.iter().all(|g| g.consistent)
    }
}

/// Groups successful node counts and flags disagreements.
///
/// With the default tolerance of `0.0` counts must be equal.
///
/// # Example
///
/// ```
/// use nqbench_benchmark::NodeCountCheck;
///
/// let check = NodeCountCheck::new(0.01);
/// assert!(check.within(1000, 995));
/// assert!(!NodeCountCheck::default().within(1000, 995));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeCountCheck {
    tolerance: f64,
}

impl NodeCountCheck {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance: tolerance.max(0.0),
        }
    }

    /// True if two counts agree within the relative tolerance.
    pub fn within(&self, a: u64, b: u64) -> bool {
        spread(a.min(b), a.max(b)) <= self.tolerance
    }

    /// Checks every successful count in `results` against its group.
    ///
    /// Rows whose target is not in `targets` are ignored.
    pub fn check(&self, results: &ResultSet, targets: &[Target]) -> ConsistencyReport {
        let mut grouped: BTreeMap<(u32, DiagramFamily, VariableOrdering), Vec<CountEntry>> =
            BTreeMap::new();
        for row in results.iter().filter(|r| r.status.is_success()) {
            let (Some(node_count), Some(target)) = (
                row.node_count,
                targets.iter().find(|t| t.id == row.spec.target),
            ) else {
                continue;
            };
            grouped
                .entry((row.spec.size, target.family, target.ordering))
                .or_default()
                .push(CountEntry {
                    target: row.spec.target.clone(),
                    workers: row.spec.workers,
                    node_count,
                    source: row.node_source,
                });
        }

        let groups = grouped
            .into_iter()
            .map(|((size, family, ordering), entries)| {
                let min = entries.iter().map(|e| e.node_count).min().unwrap_or(0);
                let max = entries.iter().map(|e| e.node_count).max().unwrap_or(0);
                let spread = spread(min, max);
                ConsistencyGroup {
                    size,
                    family,
                    ordering,
                    entries,
                    spread,
                    consistent: spread <= self.tolerance,
                }
            })
            .collect();

        ConsistencyReport {
            groups,
            tolerance: self.tolerance,
        }
    }
}

fn spread(min: u64, max: u64) -> f64 {
    if max == 0 {
        0.0
    } else {
        (max - min) as f64 / max as f64
    }
}
