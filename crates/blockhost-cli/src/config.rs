//! CLI configuration file.
//!
//! A JSON document holding supervisor settings and the server list:
//!
//! ```json
//! {
//!   "settings": { "stop_timeout_secs": 20 },
//!   "servers": [
//!     { "id": "lobby", "working_dir": "servers/lobby", "launch": { "target": "server.jar" } }
//!   ]
//! }
//! ```
//!
//! Relative working directories are resolved against the config file's directory.

use blockhost_core::paths::{PathError, default_config_path};
use blockhost_core::{ServerConfig, SettingsError, SupervisorSettings, validate_settings};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Server {0} is defined more than once")]
    DuplicateServer(String),

    #[error("Server id cannot be empty")]
    EmptyServerId,

    #[error(transparent)]
    Path(#[from] PathError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub settings: SupervisorSettings,
    pub servers: Vec<ServerConfig>,
}

impl CliConfig {
    /// Load from `explicit`, or from the default location.
    ///
    /// A missing default file yields an empty configuration; a missing
    /// explicit file is an error.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let path = default_config_path()?;
        if path.exists() {
            Self::load(&path)
        } else {
            warn!(path = %path.display(), "No config file found, no servers configured");
            Ok(Self::default())
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Loading config");
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_settings(&self.settings)?;

        let mut seen = HashSet::new();
        for server in &self.servers {
            if server.id.trim().is_empty() {
                return Err(ConfigError::EmptyServerId);
            }
            if !seen.insert(server.id.as_str()) {
                return Err(ConfigError::DuplicateServer(server.id.clone()));
            }
        }
        Ok(())
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        for server in &mut self.servers {
            if server.working_dir.is_relative() {
                server.working_dir = base.join(&server.working_dir);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockhost_core::LaunchKind;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("config.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_applies_defaults_and_resolves_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"{
                "settings": { "stop_timeout_secs": 10 },
                "servers": [
                    { "id": "lobby", "working_dir": "servers/lobby", "launch": { "target": "server.jar" } }
                ]
            }"#,
        );

        let config = CliConfig::load(&path).unwrap();

        assert_eq!(config.settings.stop_timeout_secs, 10);
        assert_eq!(config.settings.log_capacity, 1000);
        assert_eq!(config.servers.len(), 1);
        let server = &config.servers[0];
        assert_eq!(server.working_dir, dir.path().join("servers/lobby"));
        assert_eq!(server.launch.kind, LaunchKind::Jar);
        assert_eq!(server.launch.args, vec!["nogui"]);
        assert_eq!(server.executable, PathBuf::from("java"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"{ "servers": [
                { "id": "a", "working_dir": "/srv/a", "launch": { "target": "a.jar" } },
                { "id": "a", "working_dir": "/srv/b", "launch": { "target": "b.jar" } }
            ] }"#,
        );
        assert!(matches!(
            CliConfig::load(&path),
            Err(ConfigError::DuplicateServer(id)) if id == "a"
        ));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), r#"{ "settings": { "log_capacity": 0 } }"#);
        assert!(matches!(
            CliConfig::load(&path),
            Err(ConfigError::Settings(SettingsError::ZeroLogCapacity))
        ));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "{ not json");
        assert!(matches!(CliConfig::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            CliConfig::load_or_default(Some(&missing)),
            Err(ConfigError::Read { .. })
        ));
    }
}
