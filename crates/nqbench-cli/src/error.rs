//! CLI error type.

use nqbench_benchmark::HarnessError;
use nqbench_config::ConfigError;
use nqbench_encoder::NodeLimitExceeded;
use thiserror::Error;

/// Anything that stops a command. Every variant exits with code 2.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Harness(#[from] HarnessError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("reference encoding failed: {0}")]
    Encode(#[from] NodeLimitExceeded),

    #[error("cannot determine the working directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("cannot render registry as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot render registry as TOML: {0}")]
    Toml(#[from] toml::ser::Error),
}
