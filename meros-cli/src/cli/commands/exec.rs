use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use tracing::debug;

use meros_tools::BwaAligner;

use super::effective_config;
use crate::cli::GlobalOptions;

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Path to the bwa binary (default: aligner.binary from the configuration)
    #[arg(long, value_name = "PATH")]
    pub bwa: Option<PathBuf>,

    /// Arguments passed to bwa unchanged
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub args: Vec<String>,
}

pub fn run(args: ExecArgs, global: &GlobalOptions) -> Result<()> {
    let config = effective_config(global)?;
    let binary = args.bwa.unwrap_or(config.aligner.binary);
    let reference = config.aligner.reference.unwrap_or_default();

    debug!("Passing {:?} to {}", args.args, binary.display());
    let code = BwaAligner::new(binary, reference, config.aligner.algorithm)
        .exec_passthrough(&args.args)?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
