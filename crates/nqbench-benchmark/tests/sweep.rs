//! End-to-end sweeps over fake targets.

#![cfg(unix)]

use std::fs;
use std::time::Duration;

use nqbench_benchmark::{journal_path, CsvExporter, Driver, Registry, RunExecutor};
use nqbench_config::HarnessConfig;
use nqbench_core::{NodeSource, Target, TrialStatus, WorkerSupport};
use nqbench_test::process::wait_for_exit;
use nqbench_test::BenchRoot;

fn sweep(bench: &BenchRoot, targets: Vec<Target>, config: HarnessConfig) -> nqbench_benchmark::SweepReport {
    let registry = Registry::from_targets(targets).unwrap();
    Driver::new(registry, config, bench.path())
        .with_executor(
            RunExecutor::new(bench.path())
                .with_grace(Duration::from_millis(200))
                .with_parallelism(3),
        )
        .run()
        .unwrap()
}

#[test]
fn every_cell_recorded_exactly_once() {
    let bench = BenchRoot::new();
    let targets = vec![
        bench.metrics_target("fast", 10),
        bench.crashing_target("crash"),
        bench.garbage_target("garbage"),
    ];
    let config = HarnessConfig::new().with_sizes([4, 5, 6]).with_workers([0, 2]);
    let report = sweep(&bench, targets, config);

    assert_eq!(report.results.len(), 3 * 3 * 2);
    let mut keys: Vec<_> = report.results.iter().map(|r| r.spec.key()).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 18);

    for row in report.results.iter() {
        let expected = match row.spec.target.as_str() {
            "fast" => TrialStatus::Success,
            "crash" => TrialStatus::RunFailure,
            _ => TrialStatus::ParseFailure,
        };
        assert_eq!(row.status, expected, "{}", row.spec);
        assert_eq!(row.node_count.is_some(), row.status.is_success());
        assert!(row.wall_seconds.is_some());
    }
}

#[test]
fn build_failure_is_isolated() {
    let bench = BenchRoot::new();
    let targets = vec![
        bench.failing_build_target("broken"),
        bench.building_target("good", 77),
    ];
    let config = HarnessConfig::new().with_sizes([4, 5]);
    let report = sweep(&bench, targets, config);

    for size in [4, 5] {
        let broken = report.results.get("broken", size, 0).unwrap();
        assert_eq!(broken.status, TrialStatus::BuildFailure);
        assert!(broken.wall_seconds.is_none());
        assert!(broken.error.as_deref().unwrap().contains("compiler exploded"));

        let good = report.results.get("good", size, 0).unwrap();
        assert_eq!(good.status, TrialStatus::Success);
        assert_eq!(good.node_count, Some(77));
    }
    assert_eq!(bench.read("good.builds").unwrap().lines().count(), 1);
}

#[test]
fn timeout_recorded_without_orphans() {
    let bench = BenchRoot::new();
    let targets = vec![bench.sleeping_target("slow", 30), bench.metrics_target("fast", 3)];
    let mut config = HarnessConfig::new().with_sizes([4]).with_timeout_secs(1);
    config.kill_grace_ms = 200;
    let report = sweep(&bench, targets, config);

    let slow = report.results.get("slow", 4, 0).unwrap();
    assert_eq!(slow.status, TrialStatus::Timeout);
    assert!(slow.wall_seconds.unwrap() >= 1.0);
    assert!(slow.node_count.is_none());

    let pid = bench.recorded_pid("slow").unwrap();
    assert!(wait_for_exit(pid, Duration::from_secs(2)), "pid {pid} outlived its trial");

    assert_eq!(
        report.results.get("fast", 4, 0).unwrap().status,
        TrialStatus::Success
    );
}

#[test]
fn node_counts_are_deterministic() {
    let bench = BenchRoot::new();
    let config = HarnessConfig::new().with_sizes([4, 5, 6]);
    let targets = || vec![bench.metrics_target("fast", 29), bench.absent_target("reference")];

    let first = sweep(&bench, targets(), config.clone());
    let second = sweep(&bench, targets(), config);

    let counts = |report: &nqbench_benchmark::SweepReport| {
        report
            .results
            .iter()
            .map(|r| (r.spec.key().0.to_string(), r.spec.size, r.node_count))
            .collect::<Vec<_>>()
    };
    assert_eq!(counts(&first), counts(&second));

    let reference = first.results.get("reference", 4, 0).unwrap();
    assert_eq!(reference.node_count, Some(29));
    assert_eq!(reference.node_source, Some(NodeSource::Reference));
}

#[test]
fn zero_workers_per_support_mode() {
    let bench = BenchRoot::new();
    let targets = vec![
        bench.workers_target("auto", WorkerSupport::AutoDetect),
        bench.workers_target("explicit", WorkerSupport::Explicit),
        bench.metrics_target("single", 1),
    ];
    let config = HarnessConfig::new().with_sizes([4]).with_workers([0, 2]);
    let report = sweep(&bench, targets, config);

    assert_eq!(report.results.len(), 6);
    assert_eq!(report.results.successes(), 6);
    assert_eq!(bench.read("auto.workers").unwrap(), "0\n2\n");
    assert_eq!(bench.read("explicit.workers").unwrap(), "3\n2\n");
    assert!(report.results.get("single", 4, 2).is_some());
}

#[test]
fn parse_failure_on_size_mismatch() {
    let bench = BenchRoot::new();
    let config = HarnessConfig::new().with_sizes([5]);
    let report = sweep(&bench, vec![bench.wrong_size_target("liar")], config);

    let row = report.results.get("liar", 5, 0).unwrap();
    assert_eq!(row.status, TrialStatus::ParseFailure);
    assert!(row.error.as_deref().unwrap().contains("reported size 6"));
}

#[test]
fn free_text_target_parsed() {
    let bench = BenchRoot::new();
    let config = HarnessConfig::new().with_sizes([10]);
    let report = sweep(&bench, vec![bench.free_text_target("cudd")], config);

    let row = report.results.get("cudd", 10, 0).unwrap();
    assert_eq!(row.status, TrialStatus::Success);
    assert_eq!(row.node_count, Some(1_230_417));
    assert_eq!(row.solutions, Some(724.0));
}

#[test]
fn result_files_written() {
    let bench = BenchRoot::new();
    let mut config = HarnessConfig::new()
        .with_sizes([4, 5])
        .with_output("out/metrics.csv");
    config.details = Some("out/details.json".into());
    config.markdown = Some("out/report.md".into());
    let report = sweep(&bench, vec![bench.metrics_target("fast", 12)], config);

    let csv_path = bench.path().join("out/metrics.csv");
    assert_eq!(report.output, csv_path);
    let csv = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv, CsvExporter::to_string(&report.results));
    assert_eq!(csv.lines().next(), Some(CsvExporter::HEADER));
    assert_eq!(csv.lines().count(), 3);
    assert!(!journal_path(&csv_path).exists());

    let details = fs::read_to_string(bench.path().join("out/details.json")).unwrap();
    assert!(details.contains("\"node_count\": 12"));
    let markdown = fs::read_to_string(bench.path().join("out/report.md")).unwrap();
    assert!(markdown.contains("## N = 5"));
    assert!(report.consistency.is_consistent());
}
