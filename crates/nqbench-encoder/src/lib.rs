//! Reference N-Queens encoder.
//!
//! Used when a benchmark target reports no node count of its own. The
//! encoding follows the convention shared by the instrumented targets:
//! N² variables, one per cell, ordered row-major (or column-major), with the
//! row/column/diagonal exclusion constraints conjoined in level order. The
//! construction runs under a node budget and fails instead of growing without
//! bound.
//!
//! - [`manager`] - a reduced ordered BDD manager
//! - [`encode`] - builds the constraint and counts nodes for a family
//!
//! # Example
//!
//! ```
//! use nqbench_core::{DiagramFamily, VariableOrdering};
//! use nqbench_encoder::{closest_supported, encode};
//!
//! assert_eq!(closest_supported(DiagramFamily::Zdd), DiagramFamily::Bdd);
//!
//! let enc = encode(6, DiagramFamily::Bdd, VariableOrdering::RowMajor).unwrap();
//! assert_eq!(enc.solutions, 4.0);
//! ```

pub mod manager;
mod nqueens;

#[cfg(test)]
mod manager_tests;

pub use manager::NodeLimitExceeded;
pub use nqueens::{
    build, build_within, cell_level, closest_supported, encode, encode_within,
    field_node_count, NQueensEncoding, DEFAULT_NODE_LIMIT,
};
