//! Environment overrides for fakeloc
//!
//! The preferences file is the only configuration source shared with hooked
//! processes. The variables below only change where it lives, which is
//! mostly useful for tests and for running the probe against a scratch file.
//!
//! Environment variables (all optional):
//! - FAKELOC_PREFS_PATH: Absolute path of the preferences file

use crate::constants::{APP_DIR, PREFS_FILE_NAME};
use log::{debug, info, warn};
use std::env;
use std::path::PathBuf;

pub const ENV_PREFS_PATH: &str = "FAKELOC_PREFS_PATH";

/// Parse the FAKELOC_PREFS_PATH environment variable
///
/// Returns Some(path) for a non-empty absolute path
/// Returns None if not set or invalid
pub fn parse_prefs_path_override() -> Option<PathBuf> {
    match env::var(ENV_PREFS_PATH) {
        Ok(val) if val.trim().is_empty() => {
            warn!("{} is set but empty. Using default location.", ENV_PREFS_PATH);
            None
        }
        Ok(val) => {
            let path = PathBuf::from(val.trim());
            if path.is_absolute() {
                info!("Preferences path set via environment variable: {}", path.display());
                Some(path)
            } else {
                warn!(
                    "Invalid {}: {} (must be an absolute path). Using default location.",
                    ENV_PREFS_PATH,
                    path.display()
                );
                None
            }
        }
        Err(_) => {
            debug!("{} not set.", ENV_PREFS_PATH);
            None
        }
    }
}

/// Standard preferences file location
///
/// - Linux: `~/.local/share/fakeloc/fakeloc_prefs.toml`
/// - macOS: `~/Library/Application Support/fakeloc/fakeloc_prefs.toml`
/// - Windows: `%APPDATA%\fakeloc\fakeloc_prefs.toml`
pub fn default_prefs_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(PREFS_FILE_NAME)
}

/// Override from the environment if valid, else the standard location
pub fn resolve_prefs_path() -> PathBuf {
    parse_prefs_path_override().unwrap_or_else(default_prefs_path)
}
