pub mod align;
pub mod config;
pub mod exec;
pub mod partition;

use anyhow::Result;
use meros_core::{default_config_path, load_config, Config};
use tracing::debug;

use crate::cli::GlobalOptions;

/// Configuration a command starts from: `--config`, else the default file
/// when it exists, else built-in defaults. `-j` overrides the worker count.
pub fn effective_config(global: &GlobalOptions) -> Result<Config> {
    let mut config = match &global.config {
        Some(path) => load_config(path)?,
        None => {
            let path = default_config_path();
            if path.is_file() {
                debug!("Loading configuration from {}", path.display());
                load_config(&path)?
            } else {
                Config::default()
            }
        }
    };
    if let Some(workers) = global.workers {
        config.runtime.workers = workers;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meros_core::save_config;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_config_and_worker_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meros.toml");
        let mut config = Config::default();
        config.job.app_name = "exome".to_string();
        config.runtime.workers = 2;
        save_config(&path, &config).unwrap();

        let global = GlobalOptions {
            config: Some(path.clone()),
            ..Default::default()
        };
        let loaded = effective_config(&global).unwrap();
        assert_eq!(loaded.job.app_name, "exome");
        assert_eq!(loaded.runtime.workers, 2);

        let global = GlobalOptions {
            config: Some(path),
            workers: Some(6),
            ..Default::default()
        };
        assert_eq!(effective_config(&global).unwrap().runtime.workers, 6);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let global = GlobalOptions {
            config: Some("/nonexistent/meros.toml".into()),
            ..Default::default()
        };
        assert!(effective_config(&global).is_err());
    }
}
