//! Tests for trial classification and the driver lifecycle.

use std::time::Duration;

use nqbench_config::HarnessConfig;
use nqbench_core::{NodeSource, OutputFormat, Target, TrialSpec, TrialStatus};
use nqbench_test::metrics_line;

use crate::driver::*;
use crate::error::HarnessError;
use crate::executor::RunOutcome;
use crate::normalizer::Normalizer;
use crate::registry::Registry;

const TIMEOUT: Duration = Duration::from_secs(60);

fn outcome(exit_code: Option<i32>, stdout: &str, stderr: &str) -> RunOutcome {
    RunOutcome {
        exit_code,
        signal: None,
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        wall_seconds: 0.75,
        peak_rss_kb: Some(4096),
        timed_out: false,
        output_truncated: false,
        spawn_error: None,
    }
}

fn setup() -> (Target, TrialSpec, Normalizer) {
    let target = Target::new("BuDDy", "C", "./queen {size}");
    let normalizer = Normalizer::for_targets(std::slice::from_ref(&target)).unwrap();
    (target, TrialSpec::new("BuDDy", 8, 0), normalizer)
}

#[test]
fn test_state_order() {
    let mut state = DriverState::Idle;
    let mut seen = vec![state];
    while let Some(next) = state.next() {
        assert!(next > state);
        state = next;
        seen.push(state);
    }
    assert_eq!(seen.len(), 5);
    assert_eq!(state, DriverState::Finalized);
}

#[test]
fn test_classify_success() {
    let (target, spec, normalizer) = setup();
    let result = classify(
        &target,
        &spec,
        outcome(Some(0), &metrics_line(8, 92, 2451), ""),
        &normalizer,
        TIMEOUT,
    );

    assert_eq!(result.status, TrialStatus::Success);
    assert_eq!(result.language, "C");
    assert_eq!(result.node_count, Some(2451));
    assert_eq!(result.node_source, Some(NodeSource::Parsed));
    assert_eq!(result.solutions, Some(92.0));
    assert_eq!(result.wall_seconds, Some(0.75));
    assert_eq!(result.peak_rss_kb, Some(4096));
    assert!(result.error.is_none());
}

#[test]
fn test_classify_non_zero_exit() {
    let (target, spec, normalizer) = setup();
    let result = classify(
        &target,
        &spec,
        outcome(Some(139), &metrics_line(8, 92, 2451), "Segmentation fault\n"),
        &normalizer,
        TIMEOUT,
    );

    assert_eq!(result.status, TrialStatus::RunFailure);
    assert_eq!(result.node_count, None);
    assert_eq!(result.exit_code, Some(139));
    assert_eq!(
        result.error.as_deref(),
        Some("exit code 139: Segmentation fault")
    );
}

#[test]
fn test_classify_signal() {
    let (target, spec, normalizer) = setup();
    let mut killed = outcome(None, "", "");
    killed.signal = Some(9);
    let result = classify(&target, &spec, killed, &normalizer, TIMEOUT);

    assert_eq!(result.status, TrialStatus::RunFailure);
    assert_eq!(result.error.as_deref(), Some("killed by signal 9"));
}

#[test]
fn test_classify_timeout_wins_over_exit_status() {
    let (target, spec, normalizer) = setup();
    let mut slow = outcome(Some(0), &metrics_line(8, 92, 2451), "");
    slow.timed_out = true;
    let result = classify(&target, &spec, slow, &normalizer, Duration::from_secs(5));

    assert_eq!(result.status, TrialStatus::Timeout);
    assert_eq!(result.node_count, None);
    assert_eq!(result.wall_seconds, Some(0.75));
    assert_eq!(result.error.as_deref(), Some("timed out after 5s"));
}

#[test]
fn test_classify_notes_truncated_output() {
    let (target, spec, normalizer) = setup();
    let mut stuck = outcome(None, "", "");
    stuck.timed_out = true;
    stuck.output_truncated = true;
    let result = classify(&target, &spec, stuck, &normalizer, Duration::from_secs(1));

    assert_eq!(result.status, TrialStatus::Timeout);
    assert_eq!(
        result.error.as_deref(),
        Some("timed out after 1s (output truncated)")
    );
}

#[test]
fn test_classify_spawn_error() {
    let (target, spec, normalizer) = setup();
    let failed = RunOutcome::spawn_failed("No such file".to_string(), Duration::ZERO);
    let result = classify(&target, &spec, failed, &normalizer, TIMEOUT);

    assert_eq!(result.status, TrialStatus::RunFailure);
    assert_eq!(result.error.as_deref(), Some("No such file"));
}

#[test]
fn test_classify_parse_failure_keeps_output() {
    let (target, spec, normalizer) = setup();
    let result = classify(
        &target,
        &spec,
        outcome(Some(0), "done in 3ms\n", ""),
        &normalizer,
        TIMEOUT,
    );

    assert_eq!(result.status, TrialStatus::ParseFailure);
    assert_eq!(result.node_count, None);
    let error = result.error.unwrap();
    assert!(error.contains("no NQUEENS_METRICS line"), "{error}");
    assert!(error.ends_with("done in 3ms"), "{error}");
}

#[test]
fn test_classify_reference_count() {
    let target = Target::new("JDD", "Java", "jdd {size}").with_output(OutputFormat::Absent);
    let normalizer = Normalizer::for_targets(std::slice::from_ref(&target)).unwrap();
    let result = classify(
        &target,
        &TrialSpec::new("JDD", 4, 0),
        outcome(Some(0), "2 solutions\n", ""),
        &normalizer,
        TIMEOUT,
    );

    assert_eq!(result.status, TrialStatus::Success);
    assert_eq!(result.node_count, Some(29));
    assert_eq!(result.node_source, Some(NodeSource::Reference));
    assert_eq!(result.solutions, Some(2.0));
}

#[test]
fn test_unknown_target_stops_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let config = HarnessConfig::new().with_targets(["oxidd"]).with_sizes([4]);
    let mut driver = Driver::new(Registry::builtin(), config, dir.path());

    let err = driver.run().unwrap_err();
    assert!(matches!(err, HarnessError::UnknownTarget { .. }));
    assert_eq!(driver.state(), DriverState::Resolving);
    assert!(!dir.path().join("results").exists());
}

#[test]
fn test_invalid_config_stops_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let config = HarnessConfig::new().with_sizes(Vec::<u32>::new());
    let mut driver = Driver::new(Registry::builtin(), config, dir.path());

    assert!(matches!(driver.run().unwrap_err(), HarnessError::Config(_)));
}

#[cfg(unix)]
#[test]
fn test_driver_runs_once() {
    let dir = tempfile::tempdir().unwrap();
    let target = Target::new("noop", "sh", "echo 'NQUEENS_METRICS nodes=1' {size}");
    let registry = Registry::from_targets(vec![target]).unwrap();
    let config = HarnessConfig::new().with_sizes([4]);
    let mut driver = Driver::new(registry, config, dir.path());

    let report = driver.run().unwrap();
    assert_eq!(report.results.len(), 1);
    assert_eq!(driver.state(), DriverState::Finalized);
    assert!(matches!(
        driver.run().unwrap_err(),
        HarnessError::InvalidTransition {
            from: DriverState::Finalized,
            ..
        }
    ));
}
