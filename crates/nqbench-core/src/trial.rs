//! Trial specifications and results.

use std::fmt;

/// One cell of the benchmark matrix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrialSpec {
    pub target: String,
    pub size: u32,
    /// Requested worker count; `0` means auto-detect.
    pub workers: u32,
}

impl TrialSpec {
    pub fn new(target: impl Into<String>, size: u32, workers: u32) -> Self {
        Self {
            target: target.into(),
            size,
            workers,
        }
    }

    /// The (target, size, workers) key that identifies this trial.
    pub fn key(&self) -> (&str, u32, u32) {
        (&self.target, self.size, self.workers)
    }
}

impl fmt::Display for TrialSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} N={} workers={}", self.target, self.size, self.workers)
    }
}

/// Terminal status of a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum TrialStatus {
    Success,
    BuildFailure,
    RunFailure,
    ParseFailure,
    Timeout,
}

impl TrialStatus {
    /// All statuses in report order.
    pub const ALL: [TrialStatus; 5] = [
        TrialStatus::Success,
        TrialStatus::BuildFailure,
        TrialStatus::RunFailure,
        TrialStatus::ParseFailure,
        TrialStatus::Timeout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrialStatus::Success => "success",
            TrialStatus::BuildFailure => "build-failure",
            TrialStatus::RunFailure => "run-failure",
            TrialStatus::ParseFailure => "parse-failure",
            TrialStatus::Timeout => "timeout",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TrialStatus::Success)
    }
}

impl fmt::Display for TrialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a node count came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NodeSource {
    /// Read from the target's own output.
    Parsed,
    /// Computed by the reference encoder.
    Reference,
}

/// Terminal record of one trial.
///
/// Absent metrics are `None`, never zero.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrialResult {
    pub spec: TrialSpec,
    pub status: TrialStatus,
    pub language: String,
    pub wall_seconds: Option<f64>,
    pub peak_rss_kb: Option<u64>,
    pub node_count: Option<u64>,
    pub node_source: Option<NodeSource>,
    pub solutions: Option<f64>,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
}

impl TrialResult {
    /// Creates a result with no metrics.
    pub fn new(spec: TrialSpec, status: TrialStatus) -> Self {
        Self {
            spec,
            status,
            language: String::new(),
            wall_seconds: None,
            peak_rss_kb: None,
            node_count: None,
            node_source: None,
            solutions: None,
            exit_code: None,
            error: None,
        }
    }

    /// A trial that never ran because its target did not build.
    ///
    /// ```
    /// use nqbench_core::{TrialResult, TrialSpec, TrialStatus};
    ///
    /// let r = TrialResult::build_failure(TrialSpec::new("cudd", 6, 0), "make: *** Error 2");
    /// assert_eq!(r.status, TrialStatus::BuildFailure);
    /// assert_eq!(r.node_count, None);
    /// ```
    pub fn build_failure(spec: TrialSpec, detail: impl Into<String>) -> Self {
        Self::new(spec, TrialStatus::BuildFailure).with_error(detail)
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_error(mut self, detail: impl Into<String>) -> Self {
        self.error = Some(detail.into());
        self
    }

    pub fn with_telemetry(
        mut self,
        wall_seconds: f64,
        peak_rss_kb: Option<u64>,
        exit_code: Option<i32>,
    ) -> Self {
        self.wall_seconds = Some(wall_seconds);
        self.peak_rss_kb = peak_rss_kb;
        self.exit_code = exit_code;
        self
    }

    pub fn with_nodes(mut self, node_count: u64, source: NodeSource) -> Self {
        self.node_count = Some(node_count);
        self.node_source = Some(source);
        self
    }

    pub fn with_solutions(mut self, solutions: Option<f64>) -> Self {
        self.solutions = solutions;
        self
    }
}
