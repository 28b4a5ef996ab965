pub mod commands;
pub mod output;
pub mod signal;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "meros")]
#[command(author, version, about = "Partitioned BWA alignment of FASTQ reads", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Partitions aligned concurrently (0 = all cores)
    #[arg(short = 'j', long, global = true)]
    pub workers: Option<usize>,

    /// Configuration file (default: $MEROS_HOME/config.toml when present)
    #[arg(short = 'c', long, global = true, env = "MEROS_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Options shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub verbose: u8,
    pub workers: Option<usize>,
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn global(&self) -> GlobalOptions {
        GlobalOptions {
            verbose: self.verbose,
            workers: self.workers,
            config: self.config.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Partition reads, align every partition and publish one SAM per partition
    Align(commands::align::AlignArgs),

    /// Show how the reads would be partitioned without aligning
    Partition(commands::partition::PartitionArgs),

    /// Run the configured bwa binary with the given arguments
    Exec(commands::exec::ExecArgs),

    /// Show or write the configuration
    Config(commands::config::ConfigArgs),
}
