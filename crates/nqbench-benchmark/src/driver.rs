//! Sweep driver.
//!
//! Sequences Resolve, Build, Sweep and Finalize over the trial matrix. Only
//! configuration problems stop the driver; every trial-level failure becomes
//! a row of the result set.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use nqbench_config::HarnessConfig;
use nqbench_core::{Target, TrialResult, TrialSpec, TrialStatus};
use tracing::{info, warn};

use crate::aggregator::{journal_path, Aggregator, ResultSet};
use crate::build::{BuildManager, BuildOutcome};
use crate::consistency::{ConsistencyReport, NodeCountCheck};
use crate::error::HarnessError;
use crate::executor::{RunExecutor, RunOutcome};
use crate::matrix::TrialMatrix;
use crate::normalizer::Normalizer;
use crate::registry::Registry;
use crate::report::{CsvExporter, DetailsExporter, MarkdownReport};
use crate::text::{tail, TAIL_LIMIT};

/// Lifecycle of a [`Driver`]. Transitions only move forward, one step at a
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DriverState {
    Idle,
    Resolving,
    Building,
    Sweeping,
    Finalized,
}

impl DriverState {
    /// The only state reachable from `self`.
    pub fn next(self) -> Option<Self> {
        match self {
            DriverState::Idle => Some(DriverState::Resolving),
            DriverState::Resolving => Some(DriverState::Building),
            DriverState::Building => Some(DriverState::Sweeping),
            DriverState::Sweeping => Some(DriverState::Finalized),
            DriverState::Finalized => None,
        }
    }
}

/// Everything a finished sweep produced.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub results: ResultSet,
    pub consistency: ConsistencyReport,
    pub output: PathBuf,
    pub details: Option<PathBuf>,
    pub markdown: Option<PathBuf>,
    pub elapsed: Duration,
}

/// Runs one benchmark campaign.
///
/// # Example
///
/// ```no_run
/// use nqbench_benchmark::{Driver, Registry};
/// use nqbench_config::HarnessConfig;
///
/// let config = HarnessConfig::new().with_sizes([4, 5, 6]).with_targets(["Sylvan"]);
/// let mut driver = Driver::new(Registry::builtin(), config, "/opt/bench");
/// let report = driver.run()?;
/// println!("{} trials written to {}", report.results.len(), report.output.display());
/// # Ok::<(), nqbench_benchmark::HarnessError>(())
/// ```
#[derive(Debug)]
pub struct Driver {
    registry: Registry,
    config: HarnessConfig,
    root: PathBuf,
    state: DriverState,
    executor: RunExecutor,
}

impl Driver {
    pub fn new(registry: Registry, config: HarnessConfig, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let executor = RunExecutor::new(&root).with_grace(config.kill_grace());
        Self {
            registry,
            config,
            root,
            state: DriverState::Idle,
            executor,
        }
    }

    /// Replaces the run executor, e.g. to shorten the kill grace in tests.
    pub fn with_executor(mut self, executor: RunExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    fn advance(&mut self, to: DriverState) -> Result<(), HarnessError> {
        if self.state.next() != Some(to) {
            return Err(HarnessError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Runs the whole sweep and writes the result files.
    ///
    /// # Errors
    ///
    /// Configuration errors (unknown target, invalid registry, unusable
    /// output path) and failures to write the result files. A driver runs
    /// once; calling `run` again is an [`HarnessError::InvalidTransition`].
    pub fn run(&mut self) -> Result<SweepReport, HarnessError> {
        let started = Instant::now();

        self.advance(DriverState::Resolving)?;
        self.config.validate()?;
        let targets = self.registry.resolve(&self.config.targets)?;
        let matrix = TrialMatrix::new(&targets, &self.config.sizes, &self.config.workers)?;
        let normalizer = Normalizer::for_targets(&targets)?;
        let output = self.config.resolve_path(&self.root, &self.config.output);
        let journal = journal_path(&output);
        let mut aggregator = Aggregator::new(&matrix).with_journal(&journal)?;

        info!(
            event = "sweep_start",
            targets = targets.len() as u64,
            sizes = matrix.sizes().len() as u64,
            workers = matrix.workers().len() as u64,
            trials = matrix.len() as u64,
            root = %self.root.display(),
        );

        self.advance(DriverState::Building)?;
        let builds = self.build_all(&targets);

        self.advance(DriverState::Sweeping)?;
        let timeout = self.config.timeout();
        for (index, spec) in matrix.cells() {
            let target = &targets[index];
            let result = match builds.get(&spec.target) {
                Some(build) if !build.ok => TrialResult::build_failure(
                    spec.clone(),
                    build.error.clone().unwrap_or_else(|| "build failed".to_string()),
                )
                .with_language(&target.language),
                _ => {
                    let outcome = self.executor.run(target, spec, timeout);
                    classify(target, spec, outcome, &normalizer, timeout)
                }
            };
            log_trial(&result);
            aggregator.record(result)?;
        }

        self.advance(DriverState::Finalized)?;
        let results = aggregator.finalize();
        let consistency = NodeCountCheck::new(self.config.node_tolerance).check(&results, &targets);
        for group in consistency.mismatches() {
            warn!(
                event = "node_mismatch",
                size = group.size,
                family = %group.family,
                ordering = %group.ordering,
                spread = group.spread,
            );
        }

        CsvExporter::to_file(&results, &output).map_err(|e| HarnessError::io(&output, e))?;
        remove_if_present(&journal).map_err(|e| HarnessError::io(&journal, e))?;

        let details = match &self.config.details {
            Some(path) => {
                let path = self.config.resolve_path(&self.root, path);
                DetailsExporter::to_file(&results, &path)?;
                Some(path)
            }
            None => None,
        };
        let markdown = match &self.config.markdown {
            Some(path) => {
                let path = self.config.resolve_path(&self.root, path);
                MarkdownReport::to_file(&results, &consistency, &path)
                    .map_err(|e| HarnessError::io(&path, e))?;
                Some(path)
            }
            None => None,
        };

        let elapsed = started.elapsed();
        info!(
            event = "sweep_end",
            trials = results.len() as u64,
            succeeded = results.successes() as u64,
            duration_ms = elapsed.as_millis() as u64,
            output = %output.display(),
        );

        Ok(SweepReport {
            results,
            consistency,
            output,
            details,
            markdown,
            elapsed,
        })
    }

    fn build_all(&self, targets: &[Target]) -> HashMap<String, BuildOutcome> {
        let mut manager = BuildManager::new(&self.root).with_skip(self.config.skip_build);
        let mut outcomes = HashMap::with_capacity(targets.len());
        for target in targets {
            let started = Instant::now();
            let outcome = manager.ensure_built(target);
            let duration_ms = started.elapsed().as_millis() as u64;
            if outcome.ok {
                info!(
                    event = "build_end",
                    target = %target.id,
                    ok = true,
                    steps = outcome.steps_run as u64,
                    duration_ms,
                );
            } else {
                warn!(
                    event = "build_end",
                    target = %target.id,
                    ok = false,
                    steps = outcome.steps_run as u64,
                    duration_ms,
                    error = outcome.error.as_deref().unwrap_or("unknown"),
                );
            }
            outcomes.insert(target.id.clone(), outcome);
        }
        outcomes
    }
}

/// Turns a raw run outcome into the trial's terminal record.
///
/// Spawn errors and non-zero exits are run failures, an expired timeout is
/// a timeout regardless of exit status, and a clean exit is parsed for its
/// node count.
pub fn classify(
    target: &Target,
    spec: &TrialSpec,
    outcome: RunOutcome,
    normalizer: &Normalizer,
    timeout: Duration,
) -> TrialResult {
    let base = |status| {
        TrialResult::new(spec.clone(), status)
            .with_language(&target.language)
            .with_telemetry(outcome.wall_seconds, outcome.peak_rss_kb, outcome.exit_code)
    };
    let failed = |status, detail: String| {
        let detail = if outcome.output_truncated {
            format!("{detail} (output truncated)")
        } else {
            detail
        };
        base(status).with_error(detail)
    };

    if let Some(error) = &outcome.spawn_error {
        return failed(TrialStatus::RunFailure, error.clone());
    }
    if outcome.timed_out {
        return failed(
            TrialStatus::Timeout,
            format!("timed out after {}s", timeout.as_secs_f64()),
        );
    }
    if outcome.exit_code != Some(0) {
        let how = match (outcome.exit_code, outcome.signal) {
            (Some(code), _) => format!("exit code {code}"),
            (None, Some(signal)) => format!("killed by signal {signal}"),
            (None, None) => "abnormal termination".to_string(),
        };
        let stderr = tail(&outcome.stderr, TAIL_LIMIT);
        let detail = if stderr.is_empty() {
            how
        } else {
            format!("{how}: {stderr}")
        };
        return failed(TrialStatus::RunFailure, detail);
    }

    match normalizer.parse(target, spec.size, &outcome.stdout) {
        Ok(report) => base(TrialStatus::Success)
            .with_nodes(report.node_count, report.source)
            .with_solutions(report.solutions),
        Err(failure) => failed(
            TrialStatus::ParseFailure,
            format!("{}\n{}", failure.reason, failure.unparsed),
        ),
    }
}

fn log_trial(result: &TrialResult) {
    info!(
        event = "trial_end",
        target = %result.spec.target,
        size = result.spec.size,
        workers = result.spec.workers,
        status = result.status.as_str(),
        wall_seconds = result.wall_seconds,
        peak_rss_kb = result.peak_rss_kb,
        nodes = result.node_count,
        error = result.error.as_deref().map(first_line),
    );
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
