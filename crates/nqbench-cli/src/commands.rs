//! Subcommand implementations.

use std::path::PathBuf;

use nqbench_benchmark::{Driver, Registry};
use nqbench_config::HarnessConfig;
use nqbench_core::{Target, WorkerSupport};
use nqbench_encoder::{encode, NodeLimitExceeded};
use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::cli::{Cli, Command, EncodeArgs, ListArgs, ListFormat, RunArgs};
use crate::error::CliError;

pub fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Run(args) => run(args, cli.quiet),
        Command::List(args) => list(args),
        Command::Encode(args) => encode_sizes(args),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<HarnessConfig, CliError> {
    Ok(match path {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    })
}

/// Applies command-line overrides on top of the file configuration.
pub fn apply_overrides(args: &RunArgs, config: &mut HarnessConfig) {
    if !args.sizes.is_empty() {
        config.sizes = args.sizes.clone();
    }
    if !args.workers.is_empty() {
        config.workers = args.workers.clone();
    }
    if !args.targets.is_empty() {
        config.targets = args.targets.clone();
    }
    if let Some(output) = &args.output {
        config.output = output.clone();
    }
    if let Some(secs) = args.timeout {
        config.timeout_secs = secs;
    }
    if let Some(root) = &args.root {
        config.root = Some(root.clone());
    }
    if let Some(details) = &args.details {
        config.details = Some(details.clone());
    }
    if let Some(markdown) = &args.markdown {
        config.markdown = Some(markdown.clone());
    }
    if args.skip_build {
        config.skip_build = true;
    }
    if let Some(tolerance) = args.tolerance {
        config.node_tolerance = tolerance;
    }
}

fn run(args: RunArgs, quiet: bool) -> Result<(), CliError> {
    let mut config = load_config(args.config.as_ref())?;
    apply_overrides(&args, &mut config);
    config.validate()?;

    let root = match &config.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().map_err(CliError::CurrentDir)?,
    };
    let registry = Registry::from_config(&config)?;

    nqbench_console::init(quiet);
    let report = Driver::new(registry, config, root).run()?;

    if !report.consistency.is_consistent() {
        eprintln!(
            "{} node counts disagree for {} group(s); see the log above",
            "warning:".bright_yellow().bold(),
            report.consistency.mismatches().count()
        );
    }
    Ok(())
}

fn list(args: ListArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_ref())?;
    let registry = Registry::from_config(&config)?;
    let targets: Vec<Target> = registry.iter().cloned().collect();

    match args.format {
        ListFormat::Table => print!("{}", registry_table(&targets)),
        ListFormat::Json => println!("{}", serde_json::to_string_pretty(&targets)?),
        ListFormat::Toml => {
            #[derive(Serialize)]
            struct Dump<'a> {
                target: &'a [Target],
            }
            print!("{}", toml::to_string_pretty(&Dump { target: &targets })?);
        }
    }
    Ok(())
}

/// Plain-text registry listing, one target per line.
pub fn registry_table(targets: &[Target]) -> String {
    let mut out = format!(
        "{}\n",
        format!(
            "{:<10} {:<6} {:<11} {:<15} {:<6} {}",
            "ID", "LANG", "WORKERS", "OUTPUT", "FAMILY", "ORDERING"
        )
        .bold()
    );
    for target in targets {
        let workers = match target.workers {
            WorkerSupport::None => "none",
            WorkerSupport::AutoDetect => "auto-detect",
            WorkerSupport::Explicit => "explicit",
        };
        out.push_str(&format!(
            "{} {:<6} {:<11} {:<15} {:<6} {}\n",
            format!("{:<10}", target.id).bright_cyan(),
            target.language,
            workers,
            target.output.kind(),
            target.family,
            target.ordering
        ));
    }
    out
}

fn encode_sizes(args: EncodeArgs) -> Result<(), CliError> {
    print!("{}", encode_table(&args)?);
    Ok(())
}

/// Reference counts for each requested size.
pub fn encode_table(args: &EncodeArgs) -> Result<String, NodeLimitExceeded> {
    let mut out = format!(
        "{}\n",
        format!(
            "{:>3} {:<6} {:<12} {:>12} {:>12} {:>14}",
            "N", "FAMILY", "ORDERING", "NODES", "BDD NODES", "SOLUTIONS"
        )
        .bold()
    );
    for &size in &args.sizes {
        let enc = encode(size, args.family.into(), args.ordering.into())?;
        out.push_str(&format!(
            "{:>3} {:<6} {:<12} {:>12} {:>12} {:>14}\n",
            enc.size,
            enc.family.as_str(),
            enc.ordering.as_str(),
            enc.node_count.to_formatted_string(&Locale::en),
            enc.bdd_node_count.to_formatted_string(&Locale::en),
            (enc.solutions as u64).to_formatted_string(&Locale::en)
        ));
    }
    Ok(out)
}
