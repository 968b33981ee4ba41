//! Sample target output.

/// Reference BDD node count of 4-queens, row-major.
pub const REFERENCE_BDD_N4: u64 = 29;

/// Reference NDD node count of 4-queens, row-major.
pub const REFERENCE_NDD_N4: u64 = 7;

/// Known N-Queens solution counts.
pub const SOLUTIONS: [(u32, u64); 8] = [
    (1, 1),
    (2, 0),
    (3, 0),
    (4, 2),
    (5, 10),
    (6, 4),
    (7, 40),
    (8, 92),
];

/// Sylvan-style stdout: progress chatter followed by the metrics line.
pub const SYLVAN_STDOUT: &str = "\
Sylvan initialized with 8 workers
Computing N-Queens for N=8...
NQUEENS_METRICS solutions=92 nodes=2451 n=8
Time: 0.12 s
";

/// Output that repeats the marker; the last complete line wins.
pub const REPEATED_MARKER_STDOUT: &str = "\
NQUEENS_METRICS n=6 solutions=4 nodes=100
NQUEENS_METRICS n=6 solutions=4 nodes=187
NQUEENS_METRICS done
";

/// CUDD-style free text with a grouped node count.
pub const CUDD_FREE_TEXT: &str = "\
CUDD N-Queens benchmark
board: 10 x 10
solutions: 724
BDD nodes: 1,230,417 (peak 2.3M)
";

/// Pattern matching [`CUDD_FREE_TEXT`].
pub const CUDD_PATTERN: &str =
    r"board: (?P<n>\d+) x \d+\s+solutions: (?P<solutions>\d+)\s+BDD nodes: (?P<nodes>[\d,]+)";

/// The structured metrics line instrumented targets print.
///
/// ```
/// assert_eq!(
///     nqbench_test::metrics_line(8, 92, 2451),
///     "NQUEENS_METRICS n=8 solutions=92 nodes=2451"
/// );
/// ```
pub fn metrics_line(n: u32, solutions: u64, nodes: u64) -> String {
    format!("NQUEENS_METRICS n={n} solutions={solutions} nodes={nodes}")
}
