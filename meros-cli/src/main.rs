use clap::Parser;
use colored::*;
use std::process;
use tracing_subscriber::EnvFilter;

mod cli;

use crate::cli::{Cli, Commands};
use meros_core::MerosError;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins, then -v/-vv, then MEROS_LOG
    let log_level = match cli.verbose {
        0 => std::env::var("MEROS_LOG").unwrap_or_else(|_| "warn".to_string()),
        1 => "info".to_string(),
        _ => "debug".to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(exit_code(&e));
    }
}

fn exit_code(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<MerosError>() {
        Some(MerosError::Configuration(_)) => 2,
        Some(MerosError::Io(_)) => 3,
        Some(MerosError::MalformedInput(_)) => 4,
        Some(MerosError::PartitionFailure { .. }) => 5,
        Some(MerosError::Tool(_)) => 6,
        Some(MerosError::Cancelled) => 130,
        _ => 1,
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let global = cli.global();
    match cli.command {
        Commands::Align(args) => crate::cli::commands::align::run(args, &global),
        Commands::Partition(args) => crate::cli::commands::partition::run(args, &global),
        Commands::Exec(args) => crate::cli::commands::exec::run(args, &global),
        Commands::Config(args) => crate::cli::commands::config::run(args, &global),
    }
}
