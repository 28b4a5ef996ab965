//! System-level utilities for meros

pub mod paths;

pub use paths::{default_config_path, generate_app_id, is_writable_dir, meros_home, resolve_tmp_dir};
