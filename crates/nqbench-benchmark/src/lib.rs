//! Benchmark orchestration for N-Queens decision-diagram engines.
//!
//! This crate builds each registered target, runs it across a matrix of
//! board sizes and worker counts, normalizes its output to a node count and
//! writes one result row per trial.
//!
//! # Overview
//!
//! - [`Registry`] - the targets, built-in or from configuration
//! - [`BuildManager`] - runs native build steps once per target
//! - [`RunExecutor`] - launches one trial with a timeout and measures it
//! - [`Normalizer`] - extracts node counts, or computes reference ones
//! - [`Aggregator`] - collects exactly one [`TrialResult`] per cell
//! - [`Driver`] - sequences all of the above
//!
//! Trial failures are never errors: a broken build, a crash, a timeout or
//! unreadable output each become a row with the matching
//! [`TrialStatus`](nqbench_core::TrialStatus). [`HarnessError`] is reserved
//! for problems that make the whole sweep meaningless.
//!
//! # Example
//!
//! ```
//! use nqbench_benchmark::{Normalizer, Registry};
//! use nqbench_core::OutputFormat;
//!
//! let registry = Registry::builtin();
//! let mut targets = registry.resolve(&["JDD".to_string()]).unwrap();
//! let normalizer = Normalizer::for_targets(&targets).unwrap();
//!
//! let report = normalizer
//!     .parse(&targets[0], 8, "NQUEENS_METRICS n=8 solutions=92 nodes=2451\n")
//!     .unwrap();
//! assert_eq!(report.node_count, 2451);
//!
//! // A target without node output gets its count from the reference encoder.
//! targets[0].output = OutputFormat::Absent;
//! let report = normalizer.parse(&targets[0], 4, "2 solutions\n").unwrap();
//! assert_eq!(report.node_count, 29);
//! ```
//!
//! [`TrialResult`]: nqbench_core::TrialResult

mod aggregator;
mod build;
mod consistency;
mod driver;
mod error;
mod executor;
mod matrix;
mod normalizer;
mod process;
mod registry;
mod report;
mod text;

#[cfg(test)]
mod build_tests;
#[cfg(test)]
mod consistency_tests;
#[cfg(test)]
mod driver_tests;
#[cfg(test)]
mod matrix_tests;
#[cfg(test)]
mod report_tests;

pub use aggregator::{journal_path, Aggregator, ResultSet, NEVER_RECORDED};
pub use build::{BuildManager, BuildOutcome};
pub use consistency::{ConsistencyGroup, ConsistencyReport, CountEntry, NodeCountCheck};
pub use driver::{classify, Driver, DriverState, SweepReport};
pub use error::{HarnessError, RecordError};
pub use executor::{target_env, RunExecutor, RunOutcome};
pub use matrix::TrialMatrix;
pub use normalizer::{
    compile_pattern, normalize_count, FreeTextParser, NodeCountSource, NodeReport, Normalizer,
    ParseFailure, ReferenceEncoder, ReferenceSource, StructuredLogParser,
};
pub use registry::Registry;
pub use report::{CsvExporter, DetailsExporter, MarkdownReport};
pub use text::{tail, TAIL_LIMIT};
