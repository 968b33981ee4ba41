//! Error types for the harness.
//!
//! Only configuration problems are errors. Trial-level failures are recorded
//! as [`TrialStatus`](nqbench_core::TrialStatus) values instead.

use std::io;
use std::path::PathBuf;

use nqbench_config::ConfigError;
use nqbench_core::{TargetError, TrialSpec};
use thiserror::Error;

use crate::driver::DriverState;

/// Fatal harness error, raised before any trial runs or while writing results.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("unknown target '{requested}' (known targets: {known})")]
    UnknownTarget { requested: String, known: String },

    #[error("target '{0}' is registered more than once")]
    DuplicateTarget(String),

    #[error("target {target}: invalid output pattern: {source}")]
    InvalidPattern {
        target: String,
        #[source]
        source: Box<regex::Error>,
    },

    #[error("target {0}: output pattern has no named group 'nodes'")]
    MissingNodesGroup(String),

    #[error("trial matrix is empty: {0}")]
    EmptyMatrix(&'static str),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("illegal driver transition {from:?} -> {to:?}")]
    InvalidTransition { from: DriverState, to: DriverState },

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("cannot serialize trial details: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        HarnessError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A result the aggregator refused to record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("trial {0} was already recorded")]
    Duplicate(TrialSpec),

    #[error("trial {0} is not part of the requested matrix")]
    Unknown(TrialSpec),
}
