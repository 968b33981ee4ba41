//! Colorful console output for benchmark sweeps.
//!
//! Provides a `tracing` layer that renders the structured events emitted by
//! `nqbench-benchmark` (`event = "trial_end"`, `target = ...`) as one colored
//! line each.

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::sync::OnceLock;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};


/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "nqbench_benchmark=info";

static INIT: OnceLock<()> = OnceLock::new();

/// Initializes console output.
///
/// Safe to call multiple times - only the first call has effect. Prints the
/// banner unless `quiet` is set.
pub fn init(quiet: bool) {
    INIT.get_or_init(|| {
        if !quiet {
            print_banner();
        }

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        // Another subscriber may already be installed, e.g. by a test harness.
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(NqbenchConsoleLayer)
            .try_init();
    });
}

fn print_banner() {
    let banner = r#"
             _                     _
 _ __   __ _| |__   ___ _ __   ___| |__
| '_ \ / _` | '_ \ / _ \ '_ \ / __| '_ \
| | | | (_| | |_) |  __/ | | | (__| | | |
|_| |_|\__, |_.__/ \___|_| |_|\___|_| |_|
          |_|
"#;

    let version_line = format!(
        "      v{} - N-Queens decision-diagram benchmarks\n",
        env!("CARGO_PKG_VERSION")
    );

    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{}", banner.bright_cyan());
    let _ = writeln!(stdout, "{}", version_line.bright_white().bold());
    let _ = stdout.flush();
}

/// A tracing layer that formats harness events with colors.
pub struct NqbenchConsoleLayer;

impl<S: Subscriber> Layer<S> for NqbenchConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with("nqbench_") {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let output = format_event(*metadata.level(), &visitor);
        if !output.is_empty() {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }
}

#[derive(Debug, Default)]
struct EventVisitor {
    event: Option<String>,
    message: Option<String>,
    target: Option<String>,
    status: Option<String>,
    error: Option<String>,
    command: Option<String>,
    cwd: Option<String>,
    root: Option<String>,
    output: Option<String>,
    path: Option<String>,
    family: Option<String>,
    ordering: Option<String>,
    size: Option<u64>,
    workers: Option<u64>,
    targets: Option<u64>,
    sizes: Option<u64>,
    trials: Option<u64>,
    succeeded: Option<u64>,
    step: Option<u64>,
    steps: Option<u64>,
    duration_ms: Option<u64>,
    peak_rss_kb: Option<u64>,
    nodes: Option<u64>,
    wall_seconds: Option<f64>,
    spread: Option<f64>,
    ok: Option<bool>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        self.record_str(field, s.trim_matches('"'));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        let slot = match field.name() {
            "event" => &mut self.event,
            "message" => &mut self.message,
            "target" => &mut self.target,
            "status" => &mut self.status,
            "error" => &mut self.error,
            "command" => &mut self.command,
            "cwd" => &mut self.cwd,
            "root" => &mut self.root,
            "output" => &mut self.output,
            "path" => &mut self.path,
            "family" => &mut self.family,
            "ordering" => &mut self.ordering,
            _ => return,
        };
        *slot = Some(value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        let slot = match field.name() {
            "size" => &mut self.size,
            "workers" => &mut self.workers,
            "targets" => &mut self.targets,
            "sizes" => &mut self.sizes,
            "trials" => &mut self.trials,
            "succeeded" => &mut self.succeeded,
            "step" => &mut self.step,
            "steps" => &mut self.steps,
            "duration_ms" => &mut self.duration_ms,
            "peak_rss_kb" => &mut self.peak_rss_kb,
            "nodes" => &mut self.nodes,
            _ => return,
        };
        *slot = Some(value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_u64(field, value.max(0) as u64);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        match field.name() {
            "wall_seconds" => self.wall_seconds = Some(value),
            "spread" => self.spread = Some(value),
            _ => {}
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "ok" {
            self.ok = Some(value);
        }
    }
}

fn format_event(level: Level, v: &EventVisitor) -> String {
    match v.event.as_deref() {
        Some("sweep_start") => format_sweep_start(v),
        Some("build_step") => format_build_step(v),
        Some("build_end") => format_build_end(v),
        Some("trial_end") => format_trial_end(v),
        Some("node_mismatch") => format_node_mismatch(v),
        Some("journal_error") => format_journal_error(v),
        Some("sweep_end") => format_sweep_end(v),
        _ => format_message(level, v),
    }
}

fn info_prefix(tag: &str) -> String {
    format!(
        "{} {} {}",
        timestamp().bright_black(),
        "INFO".bright_green(),
        format!("[{}]", tag).bright_cyan()
    )
}

fn warn_prefix(tag: &str) -> String {
    format!(
        "{} {} {}",
        timestamp().bright_black(),
        "WARN".bright_yellow(),
        format!("[{}]", tag).bright_cyan()
    )
}

fn format_sweep_start(v: &EventVisitor) -> String {
    let trials = v.trials.unwrap_or(0);
    format!(
        "{} {} targets x {} sizes x {} worker settings = {} trials (root {})",
        info_prefix("Sweep"),
        v.targets.unwrap_or(0).bright_yellow(),
        v.sizes.unwrap_or(0).bright_yellow(),
        v.workers.unwrap_or(0).bright_yellow(),
        trials.to_formatted_string(&Locale::en).bright_magenta().bold(),
        v.root.as_deref().unwrap_or(".").white()
    )
}

fn format_build_step(v: &EventVisitor) -> String {
    format!(
        "{} {} step {} in {}: {}",
        info_prefix("Build"),
        v.target.as_deref().unwrap_or("?").white().bold(),
        v.step.unwrap_or(0),
        v.cwd.as_deref().unwrap_or("."),
        v.command.as_deref().unwrap_or("").bright_black()
    )
}

fn format_build_end(v: &EventVisitor) -> String {
    let target = v.target.as_deref().unwrap_or("?");
    if v.ok == Some(false) {
        return format!(
            "{} {} {}: {}",
            warn_prefix("Build"),
            target.white().bold(),
            "failed".bright_red().bold(),
            first_line(v.error.as_deref().unwrap_or("unknown error"))
        );
    }
    format!(
        "{} {} ready ({} steps run, {})",
        info_prefix("Build"),
        target.white().bold(),
        v.steps.unwrap_or(0),
        format_duration_ms(v.duration_ms.unwrap_or(0)).yellow()
    )
}

fn format_trial_end(v: &EventVisitor) -> String {
    let status = v.status.as_deref().unwrap_or("unknown");
    let status_colored = match status {
        "success" => format!("{:<13}", status).bright_green().to_string(),
        "timeout" => format!("{:<13}", status).yellow().to_string(),
        _ => format!("{:<13}", status).bright_red().to_string(),
    };

    let mut output = format!(
        "{} {} N={:>2} w={} {}",
        info_prefix("Run"),
        format!("{:<8}", v.target.as_deref().unwrap_or("?")).white().bold(),
        v.size.unwrap_or(0),
        v.workers.unwrap_or(0),
        status_colored
    );
    if let Some(secs) = v.wall_seconds {
        output.push_str(&format!(" time={}", format!("{:.3}s", secs).yellow()));
    }
    if let Some(kb) = v.peak_rss_kb {
        output.push_str(&format!(
            " rss={}KB",
            kb.to_formatted_string(&Locale::en).white()
        ));
    }
    if let Some(nodes) = v.nodes {
        output.push_str(&format!(
            " nodes={}",
            nodes.to_formatted_string(&Locale::en).bright_magenta().bold()
        ));
    }
    if let Some(error) = &v.error {
        output.push_str(&format!(" {}", error.bright_black()));
    }
    output
}

fn format_node_mismatch(v: &EventVisitor) -> String {
    format!(
        "{} N={} {}/{} node counts disagree (spread {})",
        warn_prefix("Check"),
        v.size.unwrap_or(0),
        v.family.as_deref().unwrap_or("?"),
        v.ordering.as_deref().unwrap_or("?"),
        format!("{:.2}%", v.spread.unwrap_or(0.0) * 100.0).bright_red()
    )
}

fn format_journal_error(v: &EventVisitor) -> String {
    format!(
        "{} cannot append to {}: {}",
        warn_prefix("Journal"),
        v.path.as_deref().unwrap_or("?"),
        v.error.as_deref().unwrap_or("unknown error")
    )
}

fn format_sweep_end(v: &EventVisitor) -> String {
    let trials = v.trials.unwrap_or(0);
    let succeeded = v.succeeded.unwrap_or(0);
    let failed = trials.saturating_sub(succeeded);

    let mut output = format!(
        "{} Sweep finished in {}",
        info_prefix("Sweep"),
        format_duration_ms(v.duration_ms.unwrap_or(0)).yellow()
    );

    output.push_str("\n\n");
    output.push_str(&"╔══════════════════════════════════════════════════════════╗".bright_cyan().to_string());
    output.push('\n');
    let rows = [
        ("Trials:", trials.to_formatted_string(&Locale::en)),
        ("Succeeded:", succeeded.to_formatted_string(&Locale::en)),
        ("Failed:", failed.to_formatted_string(&Locale::en)),
        ("Results:", v.output.clone().unwrap_or_default()),
    ];
    for (label, value) in rows {
        output.push_str(&format!(
            "{}  {:<12}{:>42}  {}",
            "║".bright_cyan(),
            label,
            value,
            "║".bright_cyan()
        ));
        output.push('\n');
    }
    output.push_str(&"╚══════════════════════════════════════════════════════════╝".bright_cyan().to_string());
    output.push('\n');

    output
}

fn format_message(level: Level, v: &EventVisitor) -> String {
    let Some(message) = &v.message else {
        return String::new();
    };
    let level = match level {
        Level::ERROR => "ERROR".bright_red().to_string(),
        Level::WARN => "WARN".bright_yellow().to_string(),
        Level::INFO => "INFO".bright_green().to_string(),
        _ => "DEBUG".bright_black().to_string(),
    };
    format!(
        "{} {} {} {}",
        timestamp().bright_black(),
        level,
        "[nqbench]".bright_cyan(),
        message
    )
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

fn timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| {
            let secs = d.as_secs() % 100000;
            let millis = d.subsec_millis();
            format!("{:5}.{:03}", secs, millis)
        })
        .unwrap_or_else(|_| "    0.000".to_string())
}

fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.2}s", ms as f64 / 1000.0)
    } else {
        let mins = ms / 60_000;
        let secs = (ms % 60_000) / 1000;
        format!("{}m {}s", mins, secs)
    }
}
