//! Shared test fixtures for nqbench crates.
//!
//! - [`outputs`] - sample target output in the formats the harness parses
//! - [`bench`] - a scratch benchmark root with fake target scripts
//! - [`process`] - liveness checks for orphan detection
//!
//! # Usage
//!
//! Add as a dev-dependency in your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! nqbench-test = { workspace = true }
//! ```
//!
//! Then build targets against a scratch root:
//!
//! ```ignore
//! use nqbench_test::BenchRoot;
//!
//! let bench = BenchRoot::new();
//! let target = bench.metrics_target("fast", 42);
//! ```

pub mod bench;
pub mod outputs;
pub mod process;

pub use bench::BenchRoot;
pub use outputs::metrics_line;
