//! A small reduced ordered BDD manager.
//!
//! Nodes are hash-consed through a unique table so every Boolean function has
//! exactly one node id. Binary operations share one computed-table cache.

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

/// Index of a node in the manager.
pub type NodeId = u32;

/// The constant-false terminal.
pub const FALSE: NodeId = 0;

/// The constant-true terminal.
pub const TRUE: NodeId = 1;

const DEFAULT_CACHE_LIMIT: usize = 1 << 22;

/// Raised when an operation would allocate past the manager's node budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("BDD node budget of {limit} nodes exhausted")]
pub struct NodeLimitExceeded {
    pub limit: usize,
}

#[derive(Debug, Clone, Copy)]
struct Node {
    level: u32,
    low: NodeId,
    high: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Op {
    And,
    Or,
    Imp,
    Not,
}

/// Reduced ordered BDD manager over a fixed number of variables.
///
/// Variable `i` sits at level `i`; terminals sit at level `var_count`.
///
/// # Example
///
/// ```
/// use nqbench_encoder::manager::{Bdd, TRUE};
///
/// let mut bdd = Bdd::new(2);
/// let x0 = bdd.var(0)?;
/// let x1 = bdd.var(1)?;
/// let f = bdd.and(x0, x1)?;
///
/// assert_eq!(bdd.node_count(f), 2);
/// assert_eq!(bdd.sat_count(f), 1.0);
/// let g = bdd.or(f, TRUE)?;
/// assert_eq!(g, TRUE);
/// # Ok::<(), nqbench_encoder::manager::NodeLimitExceeded>(())
/// ```
///
/// Nodes are never freed. [`Bdd::with_node_limit`] bounds how many may be
/// created; every operation that would exceed it fails instead.
#[derive(Debug)]
pub struct Bdd {
    var_count: u32,
    nodes: Vec<Node>,
    unique: FxHashMap<(u32, NodeId, NodeId), NodeId>,
    cache: FxHashMap<(Op, NodeId, NodeId), NodeId>,
    cache_limit: usize,
    node_limit: usize,
}

impl Bdd {
    /// Creates a manager for `var_count` variables.
    pub fn new(var_count: u32) -> Self {
        let terminal = |id| Node {
            level: var_count,
            low: id,
            high: id,
        };
        Self {
            var_count,
            nodes: vec![terminal(FALSE), terminal(TRUE)],
            unique: FxHashMap::default(),
            cache: FxHashMap::default(),
            cache_limit: DEFAULT_CACHE_LIMIT,
            node_limit: usize::MAX,
        }
    }

    /// Caps the number of non-terminal nodes the manager may create.
    pub fn with_node_limit(mut self, limit: usize) -> Self {
        self.node_limit = limit;
        self
    }

    pub fn node_limit(&self) -> usize {
        self.node_limit
    }

    /// Sets the computed-table size at which the cache is flushed.
    pub fn with_cache_limit(mut self, limit: usize) -> Self {
        self.cache_limit = limit.max(1);
        self
    }

    pub fn var_count(&self) -> u32 {
        self.var_count
    }

    /// Number of non-terminal nodes ever created.
    pub fn allocated(&self) -> usize {
        self.nodes.len() - 2
    }

    pub fn is_terminal(&self, id: NodeId) -> bool {
        id <= TRUE
    }

    pub fn level(&self, id: NodeId) -> u32 {
        self.nodes[id as usize].level
    }

    pub fn low(&self, id: NodeId) -> NodeId {
        self.nodes[id as usize].low
    }

    pub fn high(&self, id: NodeId) -> NodeId {
        self.nodes[id as usize].high
    }

    /// The positive literal of variable `level`.
    pub fn var(&mut self, level: u32) -> Result<NodeId, NodeLimitExceeded> {
        assert!(level < self.var_count, "variable {level} out of range");
        self.mk(level, FALSE, TRUE)
    }

    /// The negative literal of variable `level`.
    pub fn nvar(&mut self, level: u32) -> Result<NodeId, NodeLimitExceeded> {
        assert!(level < self.var_count, "variable {level} out of range");
        self.mk(level, TRUE, FALSE)
    }

    fn mk(&mut self, level: u32, low: NodeId, high: NodeId) -> Result<NodeId, NodeLimitExceeded> {
        if low == high {
            return Ok(low);
        }
        if let Some(&id) = self.unique.get(&(level, low, high)) {
            return Ok(id);
        }
        if self.allocated() >= self.node_limit {
            return Err(NodeLimitExceeded {
                limit: self.node_limit,
            });
        }
        let id = self.nodes.len() as NodeId;
        self.nodes.push(Node { level, low, high });
        self.unique.insert((level, low, high), id);
        Ok(id)
    }

    pub fn and(&mut self, a: NodeId, b: NodeId) -> Result<NodeId, NodeLimitExceeded> {
        self.apply(Op::And, a, b)
    }

    pub fn or(&mut self, a: NodeId, b: NodeId) -> Result<NodeId, NodeLimitExceeded> {
        self.apply(Op::Or, a, b)
    }

    /// `a => b`.
    pub fn imp(&mut self, a: NodeId, b: NodeId) -> Result<NodeId, NodeLimitExceeded> {
        self.apply(Op::Imp, a, b)
    }

    pub fn not(&mut self, a: NodeId) -> Result<NodeId, NodeLimitExceeded> {
        match a {
            FALSE => return Ok(TRUE),
            TRUE => return Ok(FALSE),
            _ => {}
        }
        if let Some(&r) = self.cache.get(&(Op::Not, a, 0)) {
            return Ok(r);
        }
        let Node { level, low, high } = self.nodes[a as usize];
        let low = self.not(low)?;
        let high = self.not(high)?;
        let r = self.mk(level, low, high)?;
        self.remember(Op::Not, a, 0, r);
        Ok(r)
    }

    fn terminal_case(
        &mut self,
        op: Op,
        a: NodeId,
        b: NodeId,
    ) -> Result<Option<NodeId>, NodeLimitExceeded> {
        Ok(match op {
            Op::And => match (a, b) {
                (FALSE, _) | (_, FALSE) => Some(FALSE),
                (TRUE, x) | (x, TRUE) => Some(x),
                _ if a == b => Some(a),
                _ => None,
            },
            Op::Or => match (a, b) {
                (TRUE, _) | (_, TRUE) => Some(TRUE),
                (FALSE, x) | (x, FALSE) => Some(x),
                _ if a == b => Some(a),
                _ => None,
            },
            Op::Imp => match (a, b) {
                (FALSE, _) | (_, TRUE) => Some(TRUE),
                (TRUE, x) => Some(x),
                (x, FALSE) => Some(self.not(x)?),
                _ if a == b => Some(TRUE),
                _ => None,
            },
            Op::Not => unreachable!("negation is handled by Bdd::not"),
        })
    }

    fn apply(&mut self, op: Op, a: NodeId, b: NodeId) -> Result<NodeId, NodeLimitExceeded> {
        if let Some(r) = self.terminal_case(op, a, b)? {
            return Ok(r);
        }
        let key = match op {
            Op::And | Op::Or if b < a => (op, b, a),
            _ => (op, a, b),
        };
        if let Some(&r) = self.cache.get(&key) {
            return Ok(r);
        }

        let na = self.nodes[a as usize];
        let nb = self.nodes[b as usize];
        let level = na.level.min(nb.level);
        let (a0, a1) = if na.level == level { (na.low, na.high) } else { (a, a) };
        let (b0, b1) = if nb.level == level { (nb.low, nb.high) } else { (b, b) };

        let low = self.apply(op, a0, b0)?;
        let high = self.apply(op, a1, b1)?;
        let r = self.mk(level, low, high)?;
        self.remember(key.0, key.1, key.2, r);
        Ok(r)
    }

    fn remember(&mut self, op: Op, a: NodeId, b: NodeId, r: NodeId) {
        if self.cache.len() >= self.cache_limit {
            self.cache.clear();
        }
        self.cache.insert((op, a, b), r);
    }

    /// Visits every non-terminal node reachable from `root` exactly once.
    pub fn reachable(&self, root: NodeId) -> Vec<NodeId> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if self.is_terminal(id) || !seen.insert(id) {
                continue;
            }
            order.push(id);
            let node = self.nodes[id as usize];
            stack.push(node.high);
            stack.push(node.low);
        }
        order
    }

    /// Number of distinct non-terminal nodes reachable from `root`.
    pub fn node_count(&self, root: NodeId) -> usize {
        self.reachable(root).len()
    }

    /// Number of satisfying assignments over all `var_count` variables.
    pub fn sat_count(&self, root: NodeId) -> f64 {
        let mut memo = FxHashMap::default();
        let below = self.count_from(root, &mut memo);
        below * 2f64.powi(self.level(root) as i32)
    }

    // Assignments of the variables from level(id) downwards that satisfy id.
    fn count_from(&self, id: NodeId, memo: &mut FxHashMap<NodeId, f64>) -> f64 {
        match id {
            FALSE => return 0.0,
            TRUE => return 1.0,
            _ => {}
        }
        if let Some(&c) = memo.get(&id) {
            return c;
        }
        let node = self.nodes[id as usize];
        let low = self.count_from(node.low, memo)
            * 2f64.powi((self.level(node.low) - node.level - 1) as i32);
        let high = self.count_from(node.high, memo)
            * 2f64.powi((self.level(node.high) - node.level - 1) as i32);
        memo.insert(id, low + high);
        low + high
    }
}
