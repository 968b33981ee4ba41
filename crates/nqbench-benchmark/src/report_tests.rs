//! Tests for report generation.

use nqbench_core::{NodeSource, Target, TrialResult, TrialSpec, TrialStatus};

use crate::aggregator::{Aggregator, ResultSet};
use crate::consistency::{ConsistencyReport, NodeCountCheck};
use crate::matrix::TrialMatrix;
use crate::report::*;

fn targets() -> Vec<Target> {
    vec![
        Target::new("BuDDy", "C", "./buddy {size}"),
        Target::new("JDD", "Java", "jdd {size}"),
    ]
}

fn sample() -> ResultSet {
    let matrix = TrialMatrix::new(&targets(), &[4, 5], &[0]).unwrap();
    let mut agg = Aggregator::new(&matrix);
    agg.record(
        TrialResult::new(TrialSpec::new("BuDDy", 4, 0), TrialStatus::Success)
            .with_telemetry(0.0125, Some(3072), Some(0))
            .with_nodes(29, NodeSource::Parsed),
    )
    .unwrap();
    agg.record(
        TrialResult::new(TrialSpec::new("JDD", 4, 0), TrialStatus::Success)
            .with_telemetry(0.5, Some(40960), Some(0))
            .with_nodes(29, NodeSource::Reference),
    )
    .unwrap();
    agg.record(
        TrialResult::new(TrialSpec::new("BuDDy", 5, 0), TrialStatus::Timeout)
            .with_telemetry(600.0, None, None)
            .with_error("timed out after 600s"),
    )
    .unwrap();
    agg.record(TrialResult::build_failure(
        TrialSpec::new("JDD", 5, 0),
        "gradle failed",
    ))
    .unwrap();
    agg.finalize()
}

#[test]
fn test_csv_header_and_rows() {
    let csv = CsvExporter::to_string(&sample());
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines,
        vec![
            "target,size,workers,status,wall_seconds,peak_rss_kb,node_count",
            "BuDDy,4,0,success,0.012500,3072,29",
            "JDD,4,0,success,0.500000,40960,29",
            "BuDDy,5,0,timeout,600.000000,,",
            "JDD,5,0,build-failure,,,",
        ]
    );
}

#[test]
fn test_csv_quotes_awkward_ids() {
    let spec = TrialSpec::new("odd,id", 4, 0);
    let row = CsvExporter::row(&TrialResult::new(spec, TrialStatus::RunFailure));
    assert_eq!(row, "\"odd,id\",4,0,run-failure,,,");
}

#[test]
fn test_csv_to_file_creates_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results/deep/metrics.csv");
    CsvExporter::to_file(&sample(), &path).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, CsvExporter::to_string(&sample()));
}

#[test]
fn test_csv_write() {
    let mut buf = Vec::new();
    CsvExporter::write(&sample(), &mut buf).unwrap();
    assert!(String::from_utf8(buf).unwrap().ends_with("JDD,5,0,build-failure,,,\n"));
}

#[test]
fn test_details_json_keeps_errors() {
    let json = DetailsExporter::to_string(&sample()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let rows = parsed.as_array().unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[3]["status"], "build-failure");
    assert_eq!(rows[3]["error"], "gradle failed");
    assert_eq!(rows[1]["node_source"], "reference");
}

#[test]
fn test_markdown_sections() {
    let set = sample();
    let consistency = NodeCountCheck::default().check(&set, &targets());
    let md = MarkdownReport::to_string(&set, &consistency);

    assert!(md.contains("# N-Queens benchmark"));
    assert!(md.contains("- **Trials**: 4"));
    assert!(md.contains("- **timeout**: 1"));
    assert!(md.contains("## N = 4"));
    assert!(md.contains("## N = 5"));
    assert!(md.contains("| JDD | 0 | success | 0.500 | 40960 | 29 (ref) |"));
    assert!(md.contains("| BuDDy | 0 | timeout | 600.000 | N/A | N/A |"));
    assert!(md.contains("## Node-count consistency"));
    assert!(md.contains("BuDDy=29, JDD=29"));
    assert!(!md.contains("**no**"));
}

#[test]
fn test_markdown_without_counts() {
    let matrix = TrialMatrix::new(&targets(), &[6], &[0]).unwrap();
    let set = Aggregator::new(&matrix).finalize();
    let md = MarkdownReport::to_string(&set, &ConsistencyReport::default());
    assert!(md.contains("*No successful node counts to compare.*"));
    assert!(md.contains("- **run-failure**: 2"));
}
