//! Tests for the build manager.

#![cfg(unix)]

use nqbench_core::{BuildStep, Target};
use nqbench_test::BenchRoot;

use crate::build::BuildManager;

#[test]
fn test_build_runs_steps_and_checks_artifact() {
    let bench = BenchRoot::new();
    let target = bench.building_target("fast", 10);
    let mut manager = BuildManager::new(bench.path());

    let outcome = manager.ensure_built(&target);
    assert!(outcome.ok, "{:?}", outcome.error);
    assert_eq!(outcome.steps_run, 1);
    assert_eq!(outcome.artifact, Some(bench.path().join("out/fast.sh")));
    assert!(bench.path().join("out/fast.sh").exists());
}

#[test]
fn test_build_attempted_once_per_manager() {
    let bench = BenchRoot::new();
    let target = Target::new("counter", "sh", "true {size}")
        .with_build_step(BuildStep::new("echo built >> counter.builds"));
    let mut manager = BuildManager::new(bench.path());

    assert!(manager.ensure_built(&target).ok);
    assert!(manager.ensure_built(&target).ok);
    assert_eq!(bench.read("counter.builds").unwrap().lines().count(), 1);
    assert!(manager.outcome("counter").is_some());
}

#[test]
fn test_creates_skips_finished_steps() {
    let bench = BenchRoot::new();
    let target = bench.building_target("fast", 10);

    assert!(BuildManager::new(bench.path()).ensure_built(&target).ok);
    let second = BuildManager::new(bench.path()).ensure_built(&target);
    assert!(second.ok);
    assert_eq!(second.steps_run, 0);
    assert_eq!(bench.read("fast.builds").unwrap().lines().count(), 1);
}

#[test]
fn test_failed_step_reports_stderr() {
    let bench = BenchRoot::new();
    let target = bench.failing_build_target("broken");
    let outcome = BuildManager::new(bench.path()).ensure_built(&target);

    assert!(!outcome.ok);
    assert_eq!(outcome.artifact, None);
    let error = outcome.error.unwrap();
    assert!(error.contains("compiler exploded"), "{error}");
    assert!(error.contains("exit"), "{error}");
}

#[test]
fn test_failure_stops_later_steps() {
    let bench = BenchRoot::new();
    let target = Target::new("two", "sh", "true {size}")
        .with_build_step(BuildStep::new("exit 1"))
        .with_build_step(BuildStep::new("touch second-ran"));
    let outcome = BuildManager::new(bench.path()).ensure_built(&target);

    assert!(!outcome.ok);
    assert_eq!(outcome.steps_run, 1);
    assert!(!bench.path().join("second-ran").exists());
}

#[test]
fn test_missing_artifact_is_failure() {
    let bench = BenchRoot::new();
    let target = Target::new("ghost", "sh", "true {size}")
        .with_build_step(BuildStep::new("true"))
        .with_artifact("out/ghost");
    let outcome = BuildManager::new(bench.path()).ensure_built(&target);

    assert!(!outcome.ok);
    assert!(outcome.error.unwrap().contains("missing after build"));
}

#[test]
fn test_skip_runs_nothing() {
    let bench = BenchRoot::new();
    let target = bench.failing_build_target("broken");
    let outcome = BuildManager::new(bench.path())
        .with_skip(true)
        .ensure_built(&target);

    assert!(outcome.ok);
    assert_eq!(outcome.steps_run, 0);
}

#[test]
fn test_jobs_placeholder_and_cwd() {
    let bench = BenchRoot::new();
    bench.write("sub/.keep", "");
    let target = Target::new("jobs", "sh", "true {size}")
        .with_build_step(BuildStep::new("echo {jobs} > jobs.txt").in_dir("sub"));
    let outcome = BuildManager::new(bench.path())
        .with_jobs(3)
        .ensure_built(&target);

    assert!(outcome.ok, "{:?}", outcome.error);
    assert_eq!(bench.read("sub/jobs.txt").unwrap().trim(), "3");
}

#[test]
fn test_chmod_exec_before_step() {
    let bench = BenchRoot::new();
    bench.write("configure", "#!/bin/sh\necho configured > configured.txt\n");
    let target = Target::new("conf", "sh", "true {size}")
        .with_build_step(BuildStep::new("./configure").chmod_exec("configure"));
    let outcome = BuildManager::new(bench.path()).ensure_built(&target);

    assert!(outcome.ok, "{:?}", outcome.error);
    assert_eq!(bench.read("configured.txt").unwrap().trim(), "configured");
}

#[test]
fn test_target_env_reaches_build() {
    let bench = BenchRoot::new();
    let target = Target::new("env", "sh", "true {size}")
        .with_env("NQBENCH_PREFIX", "{root}/lib")
        .with_build_step(BuildStep::new("echo \"$NQBENCH_PREFIX\" > prefix.txt"));
    assert!(BuildManager::new(bench.path()).ensure_built(&target).ok);

    let expected = format!("{}/lib", bench.path().display());
    assert_eq!(bench.read("prefix.txt").unwrap().trim(), expected);
}
