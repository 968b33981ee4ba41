//! Report generation for sweep results.

use std::fmt::{self, Write as _};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use nqbench_core::TrialResult;

use crate::aggregator::ResultSet;
use crate::consistency::ConsistencyReport;
use crate::error::HarnessError;

/// CSV exporter for the result file.
///
/// The schema is fixed; absent values are empty cells and rows keep matrix
/// order.
///
/// # Example
///
/// ```
/// use nqbench_benchmark::CsvExporter;
/// use nqbench_core::{NodeSource, TrialResult, TrialSpec, TrialStatus};
///
/// let ok = TrialResult::new(TrialSpec::new("BuDDy", 8, 0), TrialStatus::Success)
///     .with_telemetry(0.25, Some(2048), Some(0))
///     .with_nodes(2451, NodeSource::Parsed);
/// assert_eq!(CsvExporter::row(&ok), "BuDDy,8,0,success,0.250000,2048,2451");
///
/// let failed = TrialResult::build_failure(TrialSpec::new("CUDD", 8, 0), "make failed");
/// assert_eq!(CsvExporter::row(&failed), "CUDD,8,0,build-failure,,,");
/// ```
pub struct CsvExporter;

impl CsvExporter {
    /// Column header of the result file.
    pub const HEADER: &'static str =
        "target,size,workers,status,wall_seconds,peak_rss_kb,node_count";

    /// One CSV line for `result`, without the newline.
    pub fn row(result: &TrialResult) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            csv_field(&result.spec.target),
            result.spec.size,
            result.spec.workers,
            result.status,
            opt(result.wall_seconds.map(|s| format!("{s:.6}"))),
            opt(result.peak_rss_kb),
            opt(result.node_count),
        )
    }

    /// Exports the result set to a CSV string.
    pub fn to_string(results: &ResultSet) -> String {
        let mut output = String::with_capacity(64 * (results.len() + 1));
        output.push_str(Self::HEADER);
        output.push('\n');
        for row in results.iter() {
            output.push_str(&Self::row(row));
            output.push('\n');
        }
        output
    }

    /// Writes the CSV file, creating parent directories.
    pub fn to_file(results: &ResultSet, path: impl AsRef<Path>) -> io::Result<()> {
        write_creating_dirs(path.as_ref(), &Self::to_string(results))
    }

    /// Writes the CSV to a writer.
    pub fn write<W: Write>(results: &ResultSet, mut writer: W) -> io::Result<()> {
        writer.write_all(Self::to_string(results).as_bytes())
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn write_creating_dirs(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

/// JSON file with every field of every trial result.
pub struct DetailsExporter;

impl DetailsExporter {
    pub fn to_string(results: &ResultSet) -> Result<String, HarnessError> {
        Ok(serde_json::to_string_pretty(results.rows())?)
    }

    pub fn to_file(results: &ResultSet, path: impl AsRef<Path>) -> Result<(), HarnessError> {
        let path = path.as_ref();
        let json = Self::to_string(results)?;
        write_creating_dirs(path, &json).map_err(|e| HarnessError::io(path, e))
    }
}

/// Markdown report generator.
///
/// # Example
///
/// ```
/// use nqbench_benchmark::{Aggregator, ConsistencyReport, MarkdownReport, TrialMatrix};
/// use nqbench_core::Target;
///
/// let matrix = TrialMatrix::new(&[Target::new("jdd", "Java", "jdd {size}")], &[6], &[0]).unwrap();
/// let results = Aggregator::new(&matrix).finalize();
///
/// let md = MarkdownReport::to_string(&results, &ConsistencyReport::default());
/// assert!(md.contains("# N-Queens benchmark"));
/// assert!(md.contains("## N = 6"));
/// ```
pub struct MarkdownReport;

impl MarkdownReport {
    /// Generates a Markdown report string.
    pub fn to_string(results: &ResultSet, consistency: &ConsistencyReport) -> String {
        let mut output = String::new();
        // Writing into a String cannot fail.
        let _ = Self::render(&mut output, results, consistency);
        output
    }

    /// Writes the Markdown report to a file.
    pub fn to_file(
        results: &ResultSet,
        consistency: &ConsistencyReport,
        path: impl AsRef<Path>,
    ) -> io::Result<()> {
        write_creating_dirs(path.as_ref(), &Self::to_string(results, consistency))
    }

    fn render(out: &mut String, results: &ResultSet, consistency: &ConsistencyReport) -> fmt::Result {
        writeln!(out, "# N-Queens benchmark")?;
        writeln!(out)?;
        writeln!(out, "- **Trials**: {}", results.len())?;
        for (status, count) in results.status_counts() {
            if count > 0 {
                writeln!(out, "- **{status}**: {count}")?;
            }
        }
        writeln!(out)?;

        let mut sizes: Vec<u32> = results.iter().map(|r| r.spec.size).collect();
        sizes.dedup();
        for size in sizes {
            writeln!(out, "## N = {size}")?;
            writeln!(out)?;
            writeln!(
                out,
                "| Target | Workers | Status | Time (s) | Peak RSS (KB) | Nodes |"
            )?;
            writeln!(
                out,
                "|--------|---------|--------|----------|---------------|-------|"
            )?;
            for row in results.iter().filter(|r| r.spec.size == size) {
                writeln!(
                    out,
                    "| {} | {} | {} | {} | {} | {} |",
                    row.spec.target,
                    row.spec.workers,
                    row.status,
                    row.wall_seconds
                        .map(|s| format!("{s:.3}"))
                        .unwrap_or_else(|| "N/A".to_string()),
                    row.peak_rss_kb
                        .map(|k| k.to_string())
                        .unwrap_or_else(|| "N/A".to_string()),
                    nodes_cell(row),
                )?;
            }
            writeln!(out)?;
        }

        Self::render_consistency(out, consistency)
    }

    fn render_consistency(out: &mut String, report: &ConsistencyReport) -> fmt::Result {
        writeln!(out, "## Node-count consistency")?;
        writeln!(out)?;
        if report.groups.is_empty() {
            writeln!(out, "*No successful node counts to compare.*")?;
            return Ok(());
        }
        writeln!(out, "Relative tolerance: {}", report.tolerance)?;
        writeln!(out)?;
        writeln!(out, "| N | Family | Ordering | Counts | Spread | Consistent |")?;
        writeln!(out, "|---|--------|----------|--------|--------|------------|")?;
        for group in &report.groups {
            let counts = group
                .entries
                .iter()
                .map(|e| format!("{}={}", e.target, e.node_count))
                .collect::<Vec<_>>()
                .join(", ");
            let verdict = match (group.consistent, group.target_count()) {
                (true, 1) => "single target",
                (true, _) => "yes",
                (false, _) => "**no**",
            };
            writeln!(
                out,
                "| {} | {} | {} | {} | {:.4} | {} |",
                group.size, group.family, group.ordering, counts, group.spread, verdict
            )?;
        }
        Ok(())
    }
}

fn nodes_cell(row: &TrialResult) -> String {
    match (row.node_count, row.node_source) {
        (Some(n), Some(nqbench_core::NodeSource::Reference)) => format!("{n} (ref)"),
        (Some(n), _) => n.to_string(),
        (None, _) => "N/A".to_string(),
    }
}
