//! Tests for the node-count consistency check.

use nqbench_core::{
    DiagramFamily, NodeSource, Target, TrialResult, TrialSpec, TrialStatus, VariableOrdering,
};

use crate::aggregator::{Aggregator, ResultSet};
use crate::consistency::NodeCountCheck;
use crate::matrix::TrialMatrix;

fn target(id: &str) -> Target {
    Target::new(id, "C", format!("./{id} {{size}}"))
}

fn results(targets: &[Target], rows: Vec<TrialResult>) -> ResultSet {
    let matrix = TrialMatrix::new(targets, &[8], &[0]).unwrap();
    let mut agg = Aggregator::new(&matrix);
    for row in rows {
        agg.record(row).unwrap();
    }
    agg.finalize()
}

fn counted(id: &str, nodes: u64) -> TrialResult {
    TrialResult::new(TrialSpec::new(id, 8, 0), TrialStatus::Success)
        .with_nodes(nodes, NodeSource::Parsed)
}

#[test]
fn test_equal_counts_are_consistent() {
    let targets = [target("BuDDy"), target("CUDD")];
    let set = results(&targets, vec![counted("BuDDy", 2451), counted("CUDD", 2451)]);

    let report = NodeCountCheck::default().check(&set, &targets);
    assert_eq!(report.groups.len(), 1);
    let group = &report.groups[0];
    assert_eq!(group.size, 8);
    assert_eq!(group.target_count(), 2);
    assert_eq!(group.spread, 0.0);
    assert!(report.is_consistent());
}

#[test]
fn test_differing_counts_flagged() {
    let targets = [target("BuDDy"), target("CUDD")];
    let set = results(&targets, vec![counted("BuDDy", 2451), counted("CUDD", 2400)]);

    let report = NodeCountCheck::default().check(&set, &targets);
    assert!(!report.is_consistent());
    let mismatch: Vec<_> = report.mismatches().collect();
    assert_eq!(mismatch.len(), 1);
    assert!((mismatch[0].spread - 51.0 / 2451.0).abs() < 1e-12);
}

#[test]
fn test_tolerance_absorbs_small_spread() {
    let targets = [target("BuDDy"), target("CUDD")];
    let set = results(&targets, vec![counted("BuDDy", 1000), counted("CUDD", 990)]);
    assert!(NodeCountCheck::new(0.02).check(&set, &targets).is_consistent());
    assert!(!NodeCountCheck::new(0.005).check(&set, &targets).is_consistent());
}

#[test]
fn test_families_and_orderings_are_compared_separately() {
    let targets = [
        target("bdd"),
        target("ndd").with_family(DiagramFamily::Ndd),
        target("col").with_ordering(VariableOrdering::ColumnMajor),
    ];
    let set = results(
        &targets,
        vec![counted("bdd", 2451), counted("ndd", 300), counted("col", 2600)],
    );

    let report = NodeCountCheck::default().check(&set, &targets);
    assert_eq!(report.groups.len(), 3);
    assert!(report.is_consistent());
    assert!(report.groups.iter().all(|g| g.target_count() == 1));
}

#[test]
fn test_failed_rows_ignored() {
    let targets = [target("BuDDy"), target("CUDD")];
    let set = results(&targets, vec![counted("BuDDy", 2451)]);

    let report = NodeCountCheck::default().check(&set, &targets);
    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].entries.len(), 1);
    assert_eq!(report.groups[0].entries[0].target, "BuDDy");
}

#[test]
fn test_within() {
    let check = NodeCountCheck::new(0.1);
    assert!(check.within(100, 91));
    assert!(check.within(91, 100));
    assert!(!check.within(100, 89));
    assert!(NodeCountCheck::default().within(0, 0));
}

#[test]
fn test_negative_tolerance_clamped() {
    let check = NodeCountCheck::new(-1.0);
    assert!(check.within(5, 5));
    assert!(!check.within(5, 4));
}
