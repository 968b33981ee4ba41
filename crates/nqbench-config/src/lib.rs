//! Configuration system for nqbench.
//!
//! Load the sweep matrix and registry overrides from TOML or YAML files so a
//! benchmark campaign can be reproduced without a long command line.
//!
//! # Examples
//!
//! Load configuration from a TOML string:
//!
//! ```
//! use nqbench_config::HarnessConfig;
//! use std::time::Duration;
//!
//! let config = HarnessConfig::from_toml_str(r#"
//!     sizes = [6, 8, 10]
//!     workers = [1, 4]
//!     targets = ["buddy", "sylvan"]
//!     timeout_secs = 120
//!
//!     [[target]]
//!     id = "mybdd"
//!     language = "Rust"
//!     run = "{root}/mybdd/target/release/nqueens {size}"
//!     artifact = "mybdd/target/release/nqueens"
//!
//!     [target.output]
//!     kind = "free_text"
//!     pattern = 'nodes:\s*(?P<nodes>[\d,]+)'
//! "#).unwrap();
//!
//! assert_eq!(config.sizes, vec![6, 8, 10]);
//! assert_eq!(config.timeout(), Duration::from_secs(120));
//! assert_eq!(config.registry[0].id, "mybdd");
//! ```
//!
//! Use the defaults when no file is given:
//!
//! ```
//! use nqbench_config::HarnessConfig;
//!
//! let config = HarnessConfig::default();
//! assert_eq!(config.sizes, (4..=12).collect::<Vec<_>>());
//! assert_eq!(config.workers, vec![0]);
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nqbench_core::Target;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default result file, relative to the benchmark root.
pub const DEFAULT_OUTPUT: &str = "results/nqueens_metrics.csv";

/// Default per-trial timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// File format of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Picks the format from the file extension; anything but `.yaml`/`.yml`
    /// is read as TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                ConfigFormat::Yaml
            }
            _ => ConfigFormat::Toml,
        }
    }
}

/// Main harness configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct HarnessConfig {
    /// Board sizes to sweep.
    #[serde(default = "default_sizes")]
    pub sizes: Vec<u32>,

    /// Worker settings to sweep; `0` means auto-detect.
    #[serde(default = "default_workers")]
    pub workers: Vec<u32>,

    /// Target subset; empty means every registered target.
    #[serde(default)]
    pub targets: Vec<String>,

    /// Result CSV path, relative to the root unless absolute.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Per-trial timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Grace period between SIGTERM and SIGKILL on timeout.
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,

    /// Benchmark root holding the target sources; defaults to the working
    /// directory.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Optional JSON file with every trial result in full.
    #[serde(default)]
    pub details: Option<PathBuf>,

    /// Optional Markdown summary.
    #[serde(default)]
    pub markdown: Option<PathBuf>,

    /// Assume every target is already built.
    #[serde(default)]
    pub skip_build: bool,

    /// Relative node-count difference tolerated between targets of the same
    /// family and ordering.
    #[serde(default)]
    pub node_tolerance: f64,

    /// Drop the built-in registry and use only [`Self::registry`].
    #[serde(default)]
    pub replace_builtin: bool,

    /// Extra targets, merged over the built-in registry by id.
    #[serde(default, rename = "target")]
    pub registry: Vec<Target>,
}

fn default_sizes() -> Vec<u32> {
    (4..=12).collect()
}

fn default_workers() -> Vec<u32> {
    vec![0]
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT)
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_kill_grace_ms() -> u64 {
    2_000
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            sizes: default_sizes(),
            workers: default_workers(),
            targets: Vec::new(),
            output: default_output(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            kill_grace_ms: default_kill_grace_ms(),
            root: None,
            details: None,
            markdown: None,
            skip_build: false,
            node_tolerance: 0.0,
            replace_builtin: false,
            registry: Vec::new(),
        }
    }
}

impl HarnessConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML or YAML file, chosen by extension.
    ///
    /// # Errors
    ///
    /// Returns error if the file doesn't exist, fails to parse, or fails
    /// [`validate`](Self::validate).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = match ConfigFormat::from_path(path) {
            ConfigFormat::Toml => Self::from_toml_file(path)?,
            ConfigFormat::Yaml => Self::from_yaml_file(path)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn with_sizes(mut self, sizes: impl IntoIterator<Item = u32>) -> Self {
        self.sizes = sizes.into_iter().collect();
        self
    }

    pub fn with_workers(mut self, workers: impl IntoIterator<Item = u32>) -> Self {
        self.workers = workers.into_iter().collect();
        self
    }

    pub fn with_targets<S: Into<String>>(mut self, targets: impl IntoIterator<Item = S>) -> Self {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Adds a registry entry.
    pub fn with_target(mut self, target: Target) -> Self {
        self.registry.push(target);
        self
    }

    /// Per-trial timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    /// Resolves `path` against the configured root.
    pub fn resolve_path(&self, root: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }

    /// Checks everything that can be checked before any trial runs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sizes.is_empty() {
            return Err(ConfigError::Invalid("no board sizes requested".into()));
        }
        if self.sizes.contains(&0) {
            return Err(ConfigError::Invalid("board size must be at least 1".into()));
        }
        if self.workers.is_empty() {
            return Err(ConfigError::Invalid("no worker settings requested".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be positive".into()));
        }
        if !self.node_tolerance.is_finite() || self.node_tolerance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "node_tolerance must be a non-negative number, got {}",
                self.node_tolerance
            )));
        }
        if self.output.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("output path is empty".into()));
        }

        let mut seen = HashSet::new();
        for target in &self.registry {
            target
                .validate()
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            // Ids match case-insensitively, as the registry looks them up.
            if !seen.insert(target.id.to_ascii_lowercase()) {
                return Err(ConfigError::Invalid(format!(
                    "target '{}' is defined more than once",
                    target.id
                )));
            }
        }
        if self.replace_builtin && self.registry.is_empty() {
            return Err(ConfigError::Invalid(
                "replace_builtin is set but no [[target]] entries are defined".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
