//! Core types for nqbench.
//!
//! Everything the harness crates agree on lives here:
//!
//! - [`Target`] - one benchmarked decision-diagram implementation
//! - [`TrialSpec`] / [`TrialResult`] - one matrix cell and its terminal record
//! - [`template`] - placeholder rendering for build and run commands
//!
//! # Example
//!
//! ```
//! use nqbench_core::{OutputFormat, Target, TrialSpec, WorkerSupport};
//!
//! let target = Target::new("sylvan", "C", "{root}/sylvan/nqueens -w {workers} {size}")
//!     .with_workers(WorkerSupport::AutoDetect)
//!     .with_output(OutputFormat::structured_log());
//!
//! assert!(target.validate().is_ok());
//! assert!(target.supports_workers());
//!
//! let spec = TrialSpec::new("sylvan", 8, 0);
//! assert_eq!(spec.key(), ("sylvan", 8, 0));
//! ```

pub mod error;
pub mod target;
pub mod template;
pub mod trial;


pub use error::TargetError;
pub use target::{
    BuildStep, DiagramFamily, OutputFormat, Target, VariableOrdering, WorkerSupport,
    DEFAULT_METRICS_MARKER,
};
pub use template::{TemplateError, TemplateVars};
pub use trial::{NodeSource, TrialResult, TrialSpec, TrialStatus};
