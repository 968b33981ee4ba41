//! Run executor: launches one trial under a timeout.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use nqbench_core::template::{expand_env, render, TemplateVars};
use nqbench_core::{Target, TrialSpec, WorkerSupport};
use tracing::debug;

use crate::process::{supervise, Supervision};

/// Raw result of one process run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub exit_code: Option<i32>,
    /// Terminating signal, if the process was killed by one.
    pub signal: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub wall_seconds: f64,
    /// Peak resident set size in KB, when the platform reports it.
    pub peak_rss_kb: Option<u64>,
    pub timed_out: bool,
    /// A pipe was still held open by an escaped descendant after the grace
    /// period, so later output was dropped.
    pub output_truncated: bool,
    /// The process could not be started at all.
    pub spawn_error: Option<String>,
}

impl RunOutcome {
    pub(crate) fn spawn_failed(error: String, elapsed: Duration) -> Self {
        Self {
            exit_code: None,
            signal: None,
            stdout: String::new(),
            stderr: String::new(),
            wall_seconds: elapsed.as_secs_f64(),
            peak_rss_kb: None,
            timed_out: false,
            output_truncated: false,
            spawn_error: Some(error),
        }
    }

    /// True when the process started, finished in time and exited with 0.
    pub fn success(&self) -> bool {
        self.spawn_error.is_none() && !self.timed_out && self.exit_code == Some(0)
    }
}

/// Launches trials as `sh -c` command lines.
///
/// # Example
///
/// ```
/// use nqbench_benchmark::RunExecutor;
/// use nqbench_core::{Target, TrialSpec, WorkerSupport};
///
/// let executor = RunExecutor::new("/opt/bench").with_parallelism(8);
/// let target = Target::new("oxidd", "Rust", "{root}/oxidd -t {workers} {size}")
///     .with_workers(WorkerSupport::Explicit);
///
/// let line = executor.command_line(&target, &TrialSpec::new("oxidd", 10, 0)).unwrap();
/// assert_eq!(line, "/opt/bench/oxidd -t 8 10");
/// ```
#[derive(Debug, Clone)]
pub struct RunExecutor {
    root: PathBuf,
    grace: Duration,
    poll: Duration,
    parallelism: u32,
}

impl RunExecutor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            grace: Duration::from_secs(2),
            poll: Duration::from_millis(10),
            parallelism: available_parallelism() as u32,
        }
    }

    /// Time between SIGTERM and SIGKILL on timeout.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll.max(Duration::from_millis(1));
        self
    }

    /// Worker count substituted for `0` on explicit-worker targets.
    pub fn with_parallelism(mut self, parallelism: u32) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Worker count passed to the target, or `None` if it takes none.
    pub fn effective_workers(&self, target: &Target, requested: u32) -> Option<u32> {
        match target.workers {
            WorkerSupport::None => None,
            WorkerSupport::AutoDetect => Some(requested),
            WorkerSupport::Explicit if requested == 0 => Some(self.parallelism),
            WorkerSupport::Explicit => Some(requested),
        }
    }

    /// Renders the run template for one trial.
    pub fn command_line(
        &self,
        target: &Target,
        spec: &TrialSpec,
    ) -> Result<String, nqbench_core::TemplateError> {
        let mut vars = TemplateVars::new(self.root.to_string_lossy()).with_size(spec.size);
        if let Some(workers) = self.effective_workers(target, spec.workers) {
            vars = vars.with_workers(workers);
        }
        render(&target.run, &vars)
    }

    /// Runs one trial and returns its raw outcome.
    pub fn run(&self, target: &Target, spec: &TrialSpec, timeout: Duration) -> RunOutcome {
        let line = match self.command_line(target, spec) {
            Ok(line) => line,
            Err(e) => {
                return RunOutcome::spawn_failed(
                    format!("cannot render run command: {e}"),
                    Duration::ZERO,
                )
            }
        };
        let cwd = match &target.workdir {
            Some(dir) => self.root.join(dir),
            None => self.root.clone(),
        };
        debug!(
            event = "trial_start",
            target = %spec.target,
            size = spec.size,
            workers = spec.workers,
            command = %line,
        );

        let mut cmd = shell(&line, &cwd, target, &self.root);
        supervise(
            &mut cmd,
            Supervision {
                timeout,
                grace: self.grace,
                poll: self.poll,
            },
        )
    }
}

/// Builds an `sh -c` command with the target's environment applied.
pub(crate) fn shell(line: &str, cwd: &Path, target: &Target, root: &Path) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(line).current_dir(cwd);
    cmd.envs(target_env(target, root));
    cmd
}

/// Expands a target's extra environment against the parent environment.
pub fn target_env(target: &Target, root: &Path) -> Vec<(String, String)> {
    let root = root.to_string_lossy();
    target
        .env
        .iter()
        .map(|(key, value)| {
            let expanded = expand_env(value, &root, |name| std::env::var(name).ok());
            (key.clone(), expanded)
        })
        .collect()
}

pub(crate) fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
