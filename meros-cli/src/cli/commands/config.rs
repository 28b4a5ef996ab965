use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use meros_core::{default_config_path, save_config, Config};

use super::effective_config;
use crate::cli::output::*;
use crate::cli::GlobalOptions;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Print the built-in defaults as TOML
    #[arg(long, conflicts_with = "init")]
    pub example: bool,

    /// Write the effective configuration to a file
    #[arg(long)]
    pub init: bool,

    /// Destination for --init (default: $MEROS_HOME/config.toml)
    #[arg(short, long, requires = "init")]
    pub output: Option<PathBuf>,

    /// Overwrite an existing file with --init
    #[arg(long, requires = "init")]
    pub force: bool,
}

pub fn run(args: ConfigArgs, global: &GlobalOptions) -> Result<()> {
    if args.example {
        print!("{}", toml::to_string_pretty(&Config::default())?);
        return Ok(());
    }

    let config = effective_config(global)?;
    if !args.init {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let path = args.output.unwrap_or_else(default_config_path);
    if path.exists() && !args.force {
        warning(&format!(
            "{} already exists, pass --force to overwrite it",
            path.display()
        ));
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    save_config(&path, &config)?;
    success(&format!("Configuration written to {}", path.display()));
    Ok(())
}
