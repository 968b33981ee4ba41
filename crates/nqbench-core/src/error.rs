//! Error types for target definitions.

use thiserror::Error;

use crate::template::TemplateError;

/// A target definition that cannot be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    /// Target id is empty or contains whitespace.
    #[error("invalid target id {0:?}: ids must be non-empty and contain no whitespace")]
    InvalidId(String),

    /// Run template is empty.
    #[error("target {0}: run command template is empty")]
    EmptyRunTemplate(String),

    /// A template references a placeholder that is not allowed in that position.
    #[error("target {target}: {context} template uses unsupported placeholder {{{placeholder}}}")]
    UnsupportedPlaceholder {
        target: String,
        context: &'static str,
        placeholder: String,
    },

    /// Run template mentions `{workers}` but the target declares no worker support.
    #[error("target {0}: run template uses {{workers}} but the target declares no worker support")]
    WorkersWithoutSupport(String),

    /// Target declares worker support but never receives the worker count.
    #[error("target {0}: worker support declared but the run template has no {{workers}} placeholder")]
    MissingWorkersPlaceholder(String),

    /// Template could not be parsed.
    #[error("target {target}: {source}")]
    Template {
        target: String,
        #[source]
        source: TemplateError,
    },

    /// Free-text output declared with an empty pattern.
    #[error("target {0}: free-text output requires a non-empty pattern")]
    EmptyPattern(String),
}
