//! Data directory resolution.
//!
//! `BLOCKHOST_DATA_DIR` overrides the default `~/.blockhost`.

use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "BLOCKHOST_DATA_DIR";

/// File name of the default config file inside the data root.
pub const CONFIG_FILE: &str = "config.json";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    /// Could not determine the user's home directory.
    #[error("Cannot determine home directory")]
    NoHomeDir,
}

/// Root directory for blockhost data.
pub fn data_root() -> Result<PathBuf, PathError> {
    resolve_data_root(env::var_os(DATA_DIR_ENV).map(PathBuf::from), dirs::home_dir())
}

/// Default config file location.
pub fn default_config_path() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join(CONFIG_FILE))
}

fn resolve_data_root(
    override_dir: Option<PathBuf>,
    home: Option<PathBuf>,
) -> Result<PathBuf, PathError> {
    if let Some(dir) = override_dir.filter(|d| !d.as_os_str().is_empty()) {
        return Ok(dir);
    }
    home.map(|h| h.join(".blockhost")).ok_or(PathError::NoHomeDir)
}
