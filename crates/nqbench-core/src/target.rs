//! Benchmark target definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::error::TargetError;
use crate::template::placeholders;

/// Marker token of the structured metrics line emitted by instrumented targets.
pub const DEFAULT_METRICS_MARKER: &str = "NQUEENS_METRICS";

/// How a target reports its node count.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum OutputFormat {
    /// A marker line of `key=value` tokens (`n`, `solutions`, `nodes`).
    StructuredLog {
        #[cfg_attr(feature = "serde", serde(default = "default_marker"))]
        marker: String,
    },

    /// Free-form text matched by a target-specific regular expression with a
    /// named `nodes` group (optionally `solutions` and `n`).
    FreeText { pattern: String },

    /// No node count at all; the reference encoder supplies one.
    Absent,
}

#[cfg(feature = "serde")]
fn default_marker() -> String {
    DEFAULT_METRICS_MARKER.to_string()
}

impl OutputFormat {
    /// Structured log with the default `NQUEENS_METRICS` marker.
    pub fn structured_log() -> Self {
        OutputFormat::StructuredLog {
            marker: DEFAULT_METRICS_MARKER.to_string(),
        }
    }

    pub fn free_text(pattern: impl Into<String>) -> Self {
        OutputFormat::FreeText {
            pattern: pattern.into(),
        }
    }

    /// Short name used in logs and listings.
    pub fn kind(&self) -> &'static str {
        match self {
            OutputFormat::StructuredLog { .. } => "structured-log",
            OutputFormat::FreeText { .. } => "free-text",
            OutputFormat::Absent => "absent",
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::structured_log()
    }
}

/// Whether and how a target takes a worker count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum WorkerSupport {
    /// Single-threaded; `{workers}` is never substituted.
    #[default]
    None,

    /// Accepts `0` and detects parallelism itself.
    AutoDetect,

    /// Needs an explicit count of at least one.
    Explicit,
}

/// Decision-diagram family a target builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DiagramFamily {
    #[default]
    Bdd,
    Ndd,
    Zdd,
}

impl DiagramFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagramFamily::Bdd => "bdd",
            DiagramFamily::Ndd => "ndd",
            DiagramFamily::Zdd => "zdd",
        }
    }
}

impl fmt::Display for DiagramFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variable ordering of the N-Queens encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum VariableOrdering {
    /// Cell (r, c) is variable `r * n + c`.
    #[default]
    RowMajor,

    /// Cell (r, c) is variable `c * n + r`.
    ColumnMajor,
}

impl VariableOrdering {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableOrdering::RowMajor => "row_major",
            VariableOrdering::ColumnMajor => "column_major",
        }
    }
}

impl fmt::Display for VariableOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a target's native build.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub struct BuildStep {
    /// Shell command; may use `{root}` and `{jobs}`.
    pub command: String,

    /// Working directory relative to the benchmark root.
    #[cfg_attr(feature = "serde", serde(default))]
    pub cwd: Option<PathBuf>,

    /// Skip the step when this path (relative to the root) already exists.
    #[cfg_attr(feature = "serde", serde(default))]
    pub creates: Option<PathBuf>,

    /// Paths (relative to the root) made executable before the step runs.
    #[cfg_attr(feature = "serde", serde(default))]
    pub chmod_exec: Vec<PathBuf>,
}

impl BuildStep {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            cwd: None,
            creates: None,
            chmod_exec: Vec::new(),
        }
    }

    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn creates(mut self, path: impl Into<PathBuf>) -> Self {
        self.creates = Some(path.into());
        self
    }

    pub fn chmod_exec(mut self, path: impl Into<PathBuf>) -> Self {
        self.chmod_exec.push(path.into());
        self
    }
}

/// A benchmarked decision-diagram implementation.
///
/// Immutable once the registry is resolved; identity is [`Target::id`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub struct Target {
    pub id: String,

    #[cfg_attr(feature = "serde", serde(default))]
    pub language: String,

    /// Run command template; `{root}`, `{size}` and (when supported) `{workers}`.
    pub run: String,

    /// Directory the run command executes in, relative to the root.
    #[cfg_attr(feature = "serde", serde(default))]
    pub workdir: Option<PathBuf>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub build: Vec<BuildStep>,

    /// Path (relative to the root) whose existence means "built".
    #[cfg_attr(feature = "serde", serde(default))]
    pub artifact: Option<PathBuf>,

    /// Extra environment; values may use `{root}` and `${VAR}`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub env: BTreeMap<String, String>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub output: OutputFormat,

    #[cfg_attr(feature = "serde", serde(default))]
    pub workers: WorkerSupport,

    #[cfg_attr(feature = "serde", serde(default))]
    pub family: DiagramFamily,

    #[cfg_attr(feature = "serde", serde(default))]
    pub ordering: VariableOrdering,
}

impl Target {
    /// Creates a single-threaded BDD target with a structured-log output.
    pub fn new(id: impl Into<String>, language: impl Into<String>, run: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            language: language.into(),
            run: run.into(),
            workdir: None,
            build: Vec::new(),
            artifact: None,
            env: BTreeMap::new(),
            output: OutputFormat::default(),
            workers: WorkerSupport::None,
            family: DiagramFamily::Bdd,
            ordering: VariableOrdering::RowMajor,
        }
    }

    pub fn with_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn with_build_step(mut self, step: BuildStep) -> Self {
        self.build.push(step);
        self
    }

    pub fn with_artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact = Some(path.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    pub fn with_workers(mut self, workers: WorkerSupport) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_family(mut self, family: DiagramFamily) -> Self {
        self.family = family;
        self
    }

    pub fn with_ordering(mut self, ordering: VariableOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Returns true if the worker count is passed to the target.
    pub fn supports_workers(&self) -> bool {
        self.workers != WorkerSupport::None
    }

    /// Checks ids, templates and the output declaration.
    ///
    /// Regular expressions of free-text outputs are compiled by the harness,
    /// not here.
    pub fn validate(&self) -> Result<(), TargetError> {
        if self.id.is_empty() || self.id.chars().any(char::is_whitespace) {
            return Err(TargetError::InvalidId(self.id.clone()));
        }
        if self.run.trim().is_empty() {
            return Err(TargetError::EmptyRunTemplate(self.id.clone()));
        }

        let run_names = self.placeholders_of(&self.run)?;
        self.check_allowed(&run_names, "run", &["root", "size", "workers"])?;
        let uses_workers = run_names.contains(&"workers");
        match (self.supports_workers(), uses_workers) {
            (false, true) => return Err(TargetError::WorkersWithoutSupport(self.id.clone())),
            (true, false) => {
                return Err(TargetError::MissingWorkersPlaceholder(self.id.clone()))
            }
            _ => {}
        }

        for step in &self.build {
            let names = self.placeholders_of(&step.command)?;
            self.check_allowed(&names, "build", &["root", "jobs"])?;
        }

        if let OutputFormat::FreeText { pattern } = &self.output {
            if pattern.is_empty() {
                return Err(TargetError::EmptyPattern(self.id.clone()));
            }
        }
        Ok(())
    }

    fn placeholders_of<'a>(&self, template: &'a str) -> Result<Vec<&'a str>, TargetError> {
        placeholders(template).map_err(|source| TargetError::Template {
            target: self.id.clone(),
            source,
        })
    }

    fn check_allowed(
        &self,
        names: &[&str],
        context: &'static str,
        allowed: &[&str],
    ) -> Result<(), TargetError> {
        match names.iter().find(|n| !allowed.contains(n)) {
            Some(bad) => Err(TargetError::UnsupportedPlaceholder {
                target: self.id.clone(),
                context,
                placeholder: bad.to_string(),
            }),
            None => Ok(()),
        }
    }
}
