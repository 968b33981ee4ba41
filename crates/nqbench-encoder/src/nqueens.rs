//! N-Queens encoding on top of [`Bdd`].

use nqbench_core::{DiagramFamily, VariableOrdering};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::manager::{Bdd, NodeId, NodeLimitExceeded, FALSE, TRUE};

/// Result of encoding one board size.
#[derive(Debug, Clone, PartialEq)]
pub struct NQueensEncoding {
    pub size: u32,
    /// Family the caller asked for.
    pub requested: DiagramFamily,
    /// Family actually counted (see [`closest_supported`]).
    pub family: DiagramFamily,
    pub ordering: VariableOrdering,
    /// Node count in the counted family.
    pub node_count: u64,
    /// Node count of the underlying reduced BDD.
    pub bdd_node_count: u64,
    /// Satisfying assignments over all N² cells.
    pub solutions: f64,
    /// Non-terminal nodes created while building.
    pub allocated_nodes: u64,
}

/// Maps a family to the closest one the encoder can count.
///
/// BDD and NDD are native. ZDD falls back to BDD: both are reduced ordered
/// diagrams over the same N² variables and differ only in the reduction rule.
pub fn closest_supported(family: DiagramFamily) -> DiagramFamily {
    match family {
        DiagramFamily::Bdd | DiagramFamily::Zdd => DiagramFamily::Bdd,
        DiagramFamily::Ndd => DiagramFamily::Ndd,
    }
}

/// Variable level of cell (`row`, `col`) on an `n` x `n` board.
pub fn cell_level(n: u32, ordering: VariableOrdering, row: u32, col: u32) -> u32 {
    match ordering {
        VariableOrdering::RowMajor => row * n + col,
        VariableOrdering::ColumnMajor => col * n + row,
    }
}

/// Node budget of the reference encoder. N=12 needs a little over 3M.
pub const DEFAULT_NODE_LIMIT: usize = 6 << 20;

/// Builds the N-Queens constraint and returns the manager and root.
///
/// The board is walked in level order: a *line* is a row under row-major
/// ordering and a column under column-major, so both orderings build the
/// same diagrams up to renaming. Every line holds at least one queen, and a
/// queen excludes each later cell on its row, column and diagonals. Lines
/// are conjoined from the last level upwards, which keeps every intermediate
/// diagram limited to partial placements of the lines already added.
pub fn build(n: u32, ordering: VariableOrdering) -> Result<(Bdd, NodeId), NodeLimitExceeded> {
    build_within(n, ordering, DEFAULT_NODE_LIMIT)
}

/// [`build`] with an explicit node budget.
pub fn build_within(
    n: u32,
    ordering: VariableOrdering,
    node_limit: usize,
) -> Result<(Bdd, NodeId), NodeLimitExceeded> {
    let mut bdd = Bdd::new(n * n).with_node_limit(node_limit);
    let level = |line: u32, pos: u32| match ordering {
        VariableOrdering::RowMajor => cell_level(n, ordering, line, pos),
        VariableOrdering::ColumnMajor => cell_level(n, ordering, pos, line),
    };
    let mut queen = TRUE;

    for line in (0..n).rev() {
        let mut any = FALSE;
        let mut exclusions = TRUE;
        for pos in (0..n).rev() {
            let x = bdd.var(level(line, pos))?;
            any = bdd.or(any, x)?;

            let mut others = TRUE;
            for (l, p) in later_attacked(n, line, pos) {
                let free = bdd.nvar(level(l, p))?;
                others = bdd.and(others, free)?;
            }
            let constraint = bdd.imp(x, others)?;
            exclusions = bdd.and(exclusions, constraint)?;
        }
        let row = bdd.and(any, exclusions)?;
        queen = bdd.and(row, queen)?;
    }

    Ok((bdd, queen))
}

// Cells after (line, pos) in level order that share its line, cross line or
// a diagonal. Attacks are symmetric, so earlier cells are covered by their
// own constraint.
fn later_attacked(n: u32, line: u32, pos: u32) -> impl Iterator<Item = (u32, u32)> {
    let same_line = (pos + 1..n).map(move |p| (line, p));
    let later_lines = (line + 1..n).flat_map(move |l| {
        let d = l - line;
        [Some(pos), pos.checked_sub(d), Some(pos + d).filter(|&p| p < n)]
            .into_iter()
            .flatten()
            .map(move |p| (l, p))
    });
    same_line.chain(later_lines)
}

/// Counts NDD nodes: distinct BDD nodes entered at a field boundary.
///
/// Levels are grouped into fields of `field_width` consecutive variables.
/// The root and every node reached by an edge that crosses into a later
/// field start a new NDD node. Terminals are not counted.
pub fn field_node_count(bdd: &Bdd, root: NodeId, field_width: u32) -> usize {
    if bdd.is_terminal(root) {
        return 0;
    }
    let width = field_width.max(1);
    let mut entered = FxHashSet::default();
    entered.insert(root);

    for id in bdd.reachable(root) {
        let field = bdd.level(id) / width;
        for child in [bdd.low(id), bdd.high(id)] {
            if !bdd.is_terminal(child) && bdd.level(child) / width > field {
                entered.insert(child);
            }
        }
    }
    entered.len()
}

/// Encodes N-Queens for one size and counts nodes in the requested family.
///
/// # Errors
///
/// [`NodeLimitExceeded`] when the construction needs more than
/// [`DEFAULT_NODE_LIMIT`] nodes.
///
/// # Example
///
/// ```
/// use nqbench_core::{DiagramFamily, VariableOrdering};
/// use nqbench_encoder::encode;
///
/// let enc = encode(4, DiagramFamily::Bdd, VariableOrdering::RowMajor).unwrap();
/// assert_eq!(enc.solutions, 2.0);
/// assert_eq!(enc.node_count, 29);
/// ```
pub fn encode(
    n: u32,
    family: DiagramFamily,
    ordering: VariableOrdering,
) -> Result<NQueensEncoding, NodeLimitExceeded> {
    encode_within(n, family, ordering, DEFAULT_NODE_LIMIT)
}

/// [`encode`] with an explicit node budget.
pub fn encode_within(
    n: u32,
    family: DiagramFamily,
    ordering: VariableOrdering,
    node_limit: usize,
) -> Result<NQueensEncoding, NodeLimitExceeded> {
    let counted = closest_supported(family);
    let (bdd, root) = build_within(n, ordering, node_limit)?;

    let bdd_node_count = bdd.node_count(root) as u64;
    let node_count = match counted {
        DiagramFamily::Ndd => field_node_count(&bdd, root, n) as u64,
        _ => bdd_node_count,
    };
    let solutions = bdd.sat_count(root);

    debug!(
        event = "reference_encode",
        size = n,
        family = counted.as_str(),
        ordering = ordering.as_str(),
        node_count,
        allocated = bdd.allocated() as u64,
    );

    Ok(NQueensEncoding {
        size: n,
        requested: family,
        family: counted,
        ordering,
        node_count,
        bdd_node_count,
        solutions,
        allocated_nodes: bdd.allocated() as u64,
    })
}
