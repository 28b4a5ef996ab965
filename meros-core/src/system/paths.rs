use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// Get the meros home directory
/// Checks MEROS_HOME environment variable, falls back to ${HOME}/.meros
pub fn meros_home() -> PathBuf {
    if let Ok(path) = std::env::var("MEROS_HOME") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME")
        .unwrap_or_else(|_| std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string()));
    PathBuf::from(home).join(".meros")
}

/// Default location of the configuration file: ${MEROS_HOME}/config.toml
pub fn default_config_path() -> PathBuf {
    meros_home().join("config.toml")
}

/// Generate a session-style application id: `local-<epoch millis>`
pub fn generate_app_id() -> String {
    format!("local-{}", chrono::Utc::now().timestamp_millis())
}

/// Pick the scratch directory for a run.
///
/// Candidates are tried in order (typically the session's local dir, then the
/// cluster-wide tmp dir). A leading `file:` scheme is stripped and a literal
/// `"null"` is ignored. The first existing, writable directory wins; the
/// system temp directory is the final fallback.
pub fn resolve_tmp_dir(candidates: &[Option<&str>]) -> PathBuf {
    for candidate in candidates.iter().flatten() {
        let trimmed = candidate.trim();
        if trimmed.is_empty() || trimmed == "null" {
            continue;
        }
        let path = PathBuf::from(trimmed.strip_prefix("file:").unwrap_or(trimmed));
        if is_writable_dir(&path) {
            return path;
        }
        tracing::debug!("Skipping unusable tmp dir candidate {:?}", path);
    }
    std::env::temp_dir()
}

/// Whether `path` is a directory we can create files in
pub fn is_writable_dir(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }
    let probe = path.join(format!(".meros-probe-{}", std::process::id()));
    match OpenOptions::new().write(true).create_new(true).open(&probe) {
        Ok(_) => {
            let _ = fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}
