//! Output normalizer: turns raw target output into a node count.
//!
//! Every strategy implements [`NodeCountSource`], so the sweep does not care
//! whether a count was parsed from a structured log line, matched by a
//! free-text pattern, or computed by the reference encoder.

use std::cell::RefCell;
use std::collections::HashMap;

use nqbench_core::{DiagramFamily, NodeSource, OutputFormat, Target, VariableOrdering};
use nqbench_encoder::{encode_within, NQueensEncoding, NodeLimitExceeded, DEFAULT_NODE_LIMIT};
use regex::Regex;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

use crate::error::HarnessError;
use crate::text::{tail, TAIL_LIMIT};

/// Normalized node-count record for one trial.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeReport {
    pub node_count: u64,
    pub solutions: Option<f64>,
    /// Board size the output claims, if it says.
    pub reported_size: Option<u32>,
    pub source: NodeSource,
}

/// Output that could not be turned into a node count.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ParseFailure {
    pub reason: String,
    /// Bounded tail of the output that failed to parse.
    pub unparsed: String,
}

impl ParseFailure {
    fn new(reason: impl Into<String>, output: &str) -> Self {
        Self {
            reason: reason.into(),
            unparsed: tail(output, TAIL_LIMIT),
        }
    }
}

/// Anything that can produce a node count for a board size.
pub trait NodeCountSource {
    /// Produces the node count for `size` from a successful run's stdout.
    fn node_count(&self, size: u32, stdout: &str) -> Result<NodeReport, ParseFailure>;
}

/// Reads the last `MARKER key=value ...` line.
///
/// Keys may appear in any order; `nodes` is required, `n` and `solutions`
/// are optional. When several marker lines are printed the last one with a
/// `nodes` field wins.
///
/// # Example
///
/// ```
/// use nqbench_benchmark::{NodeCountSource, StructuredLogParser};
///
/// let out = "building...\nNQUEENS_METRICS n=8 solutions=92 nodes=2,451\n";
/// let report = StructuredLogParser::new("NQUEENS_METRICS").node_count(8, out).unwrap();
/// assert_eq!(report.node_count, 2451);
/// assert_eq!(report.solutions, Some(92.0));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StructuredLogParser<'a> {
    marker: &'a str,
}

impl<'a> StructuredLogParser<'a> {
    pub fn new(marker: &'a str) -> Self {
        Self { marker }
    }

    fn fields<'s>(&self, line: &'s str) -> Option<HashMap<&'s str, &'s str>> {
        let at = line.find(self.marker)?;
        let rest = &line[at + self.marker.len()..];
        let fields: HashMap<_, _> = rest
            .split_whitespace()
            .filter_map(|token| token.split_once('='))
            .collect();
        fields.contains_key("nodes").then_some(fields)
    }
}

impl NodeCountSource for StructuredLogParser<'_> {
    fn node_count(&self, _size: u32, stdout: &str) -> Result<NodeReport, ParseFailure> {
        let fields = stdout
            .lines()
            .rev()
            .find_map(|line| self.fields(line))
            .ok_or_else(|| {
                ParseFailure::new(format!("no {} line with a nodes field", self.marker), stdout)
            })?;

        let raw_nodes = fields.get("nodes").copied().unwrap_or_default();
        let node_count = normalize_count(raw_nodes).ok_or_else(|| {
            ParseFailure::new(format!("unreadable node count {raw_nodes:?}"), stdout)
        })?;
        let reported_size = match fields.get("n") {
            Some(raw) => Some(parse_size(raw, stdout)?),
            None => None,
        };
        Ok(NodeReport {
            node_count,
            solutions: fields.get("solutions").and_then(|s| parse_solutions(s)),
            reported_size,
            source: NodeSource::Parsed,
        })
    }
}

/// Matches free-form output with a target-specific regular expression.
///
/// The pattern must have a named group `nodes` and may have `solutions` and
/// `n`. The last match in the output wins.
#[derive(Debug, Clone)]
pub struct FreeTextParser {
    regex: Regex,
}

impl FreeTextParser {
    pub fn new(target: &str, pattern: &str) -> Result<Self, HarnessError> {
        Ok(Self {
            regex: compile_pattern(target, pattern)?,
        })
    }
}

impl NodeCountSource for FreeTextParser {
    fn node_count(&self, _size: u32, stdout: &str) -> Result<NodeReport, ParseFailure> {
        let caps = self
            .regex
            .captures_iter(stdout)
            .filter(|c| c.name("nodes").is_some())
            .last()
            .ok_or_else(|| {
                ParseFailure::new(format!("pattern /{}/ did not match", self.regex), stdout)
            })?;

        let raw_nodes = caps.name("nodes").map(|m| m.as_str()).unwrap_or_default();
        let node_count = normalize_count(raw_nodes).ok_or_else(|| {
            ParseFailure::new(format!("unreadable node count {raw_nodes:?}"), stdout)
        })?;
        let reported_size = match caps.name("n") {
            Some(m) => Some(parse_size(m.as_str(), stdout)?),
            None => None,
        };
        Ok(NodeReport {
            node_count,
            solutions: caps.name("solutions").and_then(|m| parse_solutions(m.as_str())),
            reported_size,
            source: NodeSource::Parsed,
        })
    }
}

/// Compiles a free-text pattern and checks it captures `nodes`.
pub fn compile_pattern(target: &str, pattern: &str) -> Result<Regex, HarnessError> {
    let regex = Regex::new(pattern).map_err(|e| HarnessError::InvalidPattern {
        target: target.to_string(),
        source: Box::new(e),
    })?;
    if !regex.capture_names().flatten().any(|name| name == "nodes") {
        return Err(HarnessError::MissingNodesGroup(target.to_string()));
    }
    Ok(regex)
}

/// Memoized reference encoder shared by all targets without node output.
///
/// Encodings that exhaust the node budget are remembered too, so a size
/// that is too large fails once per family and ordering.
#[derive(Debug)]
pub struct ReferenceEncoder {
    node_limit: usize,
    memo: RefCell<
        FxHashMap<(DiagramFamily, VariableOrdering, u32), Result<NQueensEncoding, NodeLimitExceeded>>,
    >,
}

impl Default for ReferenceEncoder {
    fn default() -> Self {
        Self {
            node_limit: DEFAULT_NODE_LIMIT,
            memo: RefCell::default(),
        }
    }
}

impl ReferenceEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node_limit(mut self, limit: usize) -> Self {
        self.node_limit = limit;
        self
    }

    /// Encodes N-Queens for `size`, reusing earlier results.
    pub fn encode(
        &self,
        family: DiagramFamily,
        ordering: VariableOrdering,
        size: u32,
    ) -> Result<NQueensEncoding, NodeLimitExceeded> {
        let key = (family, ordering, size);
        if let Some(hit) = self.memo.borrow().get(&key) {
            return hit.clone();
        }
        let encoding = encode_within(size, family, ordering, self.node_limit);
        self.memo.borrow_mut().insert(key, encoding.clone());
        encoding
    }

    /// Number of distinct encodings computed so far.
    pub fn cached(&self) -> usize {
        self.memo.borrow().len()
    }

    /// A [`NodeCountSource`] for one family and ordering.
    pub fn source(&self, family: DiagramFamily, ordering: VariableOrdering) -> ReferenceSource<'_> {
        ReferenceSource {
            encoder: self,
            family,
            ordering,
        }
    }
}

/// Reference encoder bound to a family and ordering.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceSource<'a> {
    encoder: &'a ReferenceEncoder,
    family: DiagramFamily,
    ordering: VariableOrdering,
}

impl NodeCountSource for ReferenceSource<'_> {
    fn node_count(&self, size: u32, stdout: &str) -> Result<NodeReport, ParseFailure> {
        let enc = self
            .encoder
            .encode(self.family, self.ordering, size)
            .map_err(|e| {
                ParseFailure::new(format!("reference encoder failed at N={size}: {e}"), stdout)
            })?;
        Ok(NodeReport {
            node_count: enc.node_count,
            solutions: Some(enc.solutions),
            reported_size: Some(enc.size),
            source: NodeSource::Reference,
        })
    }
}

/// Dispatches each target to its node-count strategy.
#[derive(Debug, Default)]
pub struct Normalizer {
    free_text: HashMap<String, FreeTextParser>,
    reference: ReferenceEncoder,
}

impl Normalizer {
    /// Prepares parsers for `targets`, compiling free-text patterns once.
    pub fn for_targets(targets: &[Target]) -> Result<Self, HarnessError> {
        let mut free_text = HashMap::new();
        for target in targets {
            if let OutputFormat::FreeText { pattern } = &target.output {
                free_text.insert(target.id.clone(), FreeTextParser::new(&target.id, pattern)?);
            }
        }
        Ok(Self {
            free_text,
            reference: ReferenceEncoder::new(),
        })
    }

    /// Replaces the reference encoder's node budget.
    pub fn with_node_limit(mut self, limit: usize) -> Self {
        self.reference = ReferenceEncoder::new().with_node_limit(limit);
        self
    }

    pub fn reference(&self) -> &ReferenceEncoder {
        &self.reference
    }

    /// Extracts the node count of a successful run of `target` at `size`.
    ///
    /// A reported board size different from `size` is a parse failure.
    pub fn parse(&self, target: &Target, size: u32, stdout: &str) -> Result<NodeReport, ParseFailure> {
        let report = match &target.output {
            OutputFormat::StructuredLog { marker } => {
                StructuredLogParser::new(marker).node_count(size, stdout)
            }
            OutputFormat::FreeText { .. } => match self.free_text.get(&target.id) {
                Some(parser) => parser.node_count(size, stdout),
                None => Err(ParseFailure::new(
                    format!("no compiled pattern for target {}", target.id),
                    stdout,
                )),
            },
            OutputFormat::Absent => self
                .reference
                .source(target.family, target.ordering)
                .node_count(size, stdout),
        }?;

        if let Some(reported) = report.reported_size {
            if reported != size {
                return Err(ParseFailure::new(
                    format!("{} reported size {reported} but {size} was requested", target.id),
                    stdout,
                ));
            }
        }
        debug!(
            event = "node_count",
            target = %target.id,
            size,
            nodes = report.node_count,
            source = ?report.source,
        );
        Ok(report)
    }
}

fn parse_size(raw: &str, stdout: &str) -> Result<u32, ParseFailure> {
    normalize_count(raw)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| ParseFailure::new(format!("unreadable board size {raw:?}"), stdout))
}

fn parse_solutions(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    raw.parse::<f64>()
        .ok()
        .or_else(|| normalize_count(raw).map(|n| n as f64))
}

/// Normalizes a human-formatted count to an integer.
///
/// Accepts thousands separators (`,` `_` `'`, regular, thin and no-break
/// spaces, and `.` when it groups digits by three) and the unit suffixes
/// `k`, `M` and `G`.
///
/// ```
/// use nqbench_benchmark::normalize_count;
///
/// assert_eq!(normalize_count("1,234,567"), Some(1_234_567));
/// assert_eq!(normalize_count("1.234.567"), Some(1_234_567));
/// assert_eq!(normalize_count("2.5M"), Some(2_500_000));
/// assert_eq!(normalize_count("12k"), Some(12_000));
/// assert_eq!(normalize_count("12.5"), None);
/// ```
pub fn normalize_count(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    let (number, scale) = match trimmed.chars().last()? {
        'k' | 'K' => (&trimmed[..trimmed.len() - 1], 1e3),
        'M' => (&trimmed[..trimmed.len() - 1], 1e6),
        'G' => (&trimmed[..trimmed.len() - 1], 1e9),
        _ => (trimmed, 1.0),
    };
    let digits: String = number
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | '\'' | ' ' | '\u{2009}' | '\u{202f}' | '\u{a0}'))
        .collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }

    if scale > 1.0 {
        let value: f64 = digits.parse().ok()?;
        let scaled = (value * scale).round();
        return (scaled.is_finite() && scaled >= 0.0).then_some(scaled as u64);
    }

    let groups: Vec<&str> = digits.split('.').collect();
    match groups.as_slice() {
        [whole] => whole.parse().ok(),
        [first, rest @ ..] if !first.is_empty() && rest.iter().all(|g| g.len() == 3) => {
            groups.concat().parse().ok()
        }
        [whole, frac] if !whole.is_empty() && frac.chars().all(|c| c == '0') => whole.parse().ok(),
        _ => None,
    }
}
