//! `nqbench` - N-Queens decision-diagram benchmark harness.

mod cli;
mod commands;
mod error;

use std::process::ExitCode;

use clap::Parser;
use owo_colors::OwoColorize;

use crate::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match commands::dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".bright_red().bold(), e);
            ExitCode::from(2)
        }
    }
}
