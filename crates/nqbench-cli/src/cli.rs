//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use nqbench_core::{DiagramFamily, VariableOrdering};

/// N-Queens decision-diagram benchmark harness
#[derive(Parser, Debug)]
#[command(name = "nqbench")]
#[command(author, version, about = "Build, run and compare N-Queens BDD/NDD benchmarks")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Suppress the banner
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the targets and sweep the trial matrix
    Run(RunArgs),

    /// Show the resolved target registry
    List(ListArgs),

    /// Print reference node and solution counts without running any target
    Encode(EncodeArgs),
}

/// Arguments for `nqbench run`. Flags override the configuration file.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Board sizes, e.g. `--sizes 4,5,6` or `--sizes 4 5 6`
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub sizes: Vec<u32>,

    /// Worker settings; 0 lets the target pick
    #[arg(short, long, num_args = 1.., value_delimiter = ',')]
    pub workers: Vec<u32>,

    /// Target ids to run (default: all registered targets)
    #[arg(short, long, num_args = 1.., value_delimiter = ',')]
    pub targets: Vec<String>,

    /// Result CSV path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Per-trial timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// TOML or YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Benchmark root holding the target sources (default: current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Also write every trial result as JSON
    #[arg(long)]
    pub details: Option<PathBuf>,

    /// Also write a Markdown summary
    #[arg(long)]
    pub markdown: Option<PathBuf>,

    /// Assume every target is already built
    #[arg(long)]
    pub skip_build: bool,

    /// Relative node-count difference tolerated between comparable targets
    #[arg(long)]
    pub tolerance: Option<f64>,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Configuration file whose targets extend or replace the built-ins
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = ListFormat::Table)]
    pub format: ListFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    #[default]
    Table,
    Json,
    /// `[[target]]` entries ready to paste into a configuration file
    Toml,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Board sizes to encode
    #[arg(long, num_args = 1.., value_delimiter = ',', default_values_t = [4, 5, 6, 7, 8])]
    pub sizes: Vec<u32>,

    /// Diagram family to count
    #[arg(long, value_enum, default_value_t = FamilyArg::Bdd)]
    pub family: FamilyArg,

    /// Variable ordering of the board cells
    #[arg(long, value_enum, default_value_t = OrderingArg::RowMajor)]
    pub ordering: OrderingArg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FamilyArg {
    Bdd,
    Ndd,
    Zdd,
}

impl From<FamilyArg> for DiagramFamily {
    fn from(arg: FamilyArg) -> Self {
        match arg {
            FamilyArg::Bdd => DiagramFamily::Bdd,
            FamilyArg::Ndd => DiagramFamily::Ndd,
            FamilyArg::Zdd => DiagramFamily::Zdd,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OrderingArg {
    #[value(name = "row_major", alias = "row-major")]
    RowMajor,
    #[value(name = "column_major", alias = "column-major")]
    ColumnMajor,
}

impl From<OrderingArg> for VariableOrdering {
    fn from(arg: OrderingArg) -> Self {
        match arg {
            OrderingArg::RowMajor => VariableOrdering::RowMajor,
            OrderingArg::ColumnMajor => VariableOrdering::ColumnMajor,
        }
    }
}
