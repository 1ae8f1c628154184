//! Server instance configuration.
//!
//! `ServerConfig` is owned by the external record store. The supervisor reads
//! a snapshot of it on `start` and never mutates it while the process runs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::properties::PropertyOverlay;

/// Default executable for jar-based servers.
pub const DEFAULT_EXECUTABLE: &str = "java";

/// Declared JVM heap bounds in megabytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBounds {
    /// Initial heap (`-Xms`).
    pub min_mb: u32,
    /// Maximum heap (`-Xmx`).
    pub max_mb: u32,
}

impl MemoryBounds {
    /// Create memory bounds, swapping the values if given in the wrong order.
    #[must_use]
    pub const fn new(min_mb: u32, max_mb: u32) -> Self {
        if min_mb > max_mb {
            Self {
                min_mb: max_mb,
                max_mb: min_mb,
            }
        } else {
            Self { min_mb, max_mb }
        }
    }

    /// Render as JVM flags, initial heap first.
    pub fn to_flags(self) -> [String; 2] {
        [format!("-Xms{}M", self.min_mb), format!("-Xmx{}M", self.max_mb)]
    }
}

/// How the launch target is handed to the executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchKind {
    /// `<executable> ... -jar <target> <args>`
    #[default]
    Jar,
    /// `<executable> ... <target> <args>`
    Script,
}

/// The artifact a server is launched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchTarget {
    #[serde(default)]
    pub kind: LaunchKind,
    /// Path to the artifact, relative to the working directory unless absolute.
    pub target: PathBuf,
    /// Arguments placed after the target.
    #[serde(default = "default_target_args")]
    pub args: Vec<String>,
}

fn default_target_args() -> Vec<String> {
    vec!["nogui".to_string()]
}

impl LaunchTarget {
    /// A jar launch target with the default `nogui` argument.
    pub fn jar(target: impl Into<PathBuf>) -> Self {
        Self {
            kind: LaunchKind::Jar,
            target: target.into(),
            args: default_target_args(),
        }
    }

    /// A script launch target with no extra arguments.
    pub fn script(target: impl Into<PathBuf>) -> Self {
        Self {
            kind: LaunchKind::Script,
            target: target.into(),
            args: Vec::new(),
        }
    }
}

/// Configuration for one managed server instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Stable unique identifier.
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Directory the process runs in.
    pub working_dir: PathBuf,
    /// Executable to spawn.
    #[serde(default = "default_executable")]
    pub executable: PathBuf,
    /// Declared heap bounds, rendered before any other flag.
    #[serde(default)]
    pub memory: Option<MemoryBounds>,
    /// Extra launch flags, placed between the memory bounds and the target.
    #[serde(default)]
    pub extra_flags: Vec<String>,
    pub launch: LaunchTarget,
    /// Port written to `server-port` in the properties file.
    #[serde(default)]
    pub port: Option<u16>,
    /// Properties merged into `server.properties` before each start.
    #[serde(default)]
    pub properties: PropertyOverlay,
}

fn default_executable() -> PathBuf {
    PathBuf::from(DEFAULT_EXECUTABLE)
}

impl ServerConfig {
    /// Create a configuration with required fields.
    pub fn new(id: impl Into<String>, working_dir: impl Into<PathBuf>, launch: LaunchTarget) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            working_dir: working_dir.into(),
            executable: default_executable(),
            memory: None,
            extra_flags: Vec::new(),
            launch,
            port: None,
            properties: PropertyOverlay::new(),
        }
    }

    #[must_use]
    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    #[must_use]
    pub const fn with_memory(mut self, memory: MemoryBounds) -> Self {
        self.memory = Some(memory);
        self
    }

    #[must_use]
    pub fn with_extra_flags(mut self, flags: Vec<String>) -> Self {
        self.extra_flags = flags;
        self
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn with_properties(mut self, properties: PropertyOverlay) -> Self {
        self.properties = properties;
        self
    }

    /// Absolute (or working-directory-relative) path of the launch artifact.
    pub fn launch_path(&self) -> PathBuf {
        self.resolve(&self.launch.target)
    }

    /// Resolve a path against the working directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }

    /// Arguments passed to the executable: memory bounds first, then extra
    /// flags, then the launch target and its arguments.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(memory) = self.memory {
            args.extend(memory.to_flags());
        }
        args.extend(self.extra_flags.iter().cloned());
        if self.launch.kind == LaunchKind::Jar {
            args.push("-jar".to_string());
        }
        args.push(self.launch.target.to_string_lossy().into_owned());
        args.extend(self.launch.args.iter().cloned());
        args
    }

    /// The overlay applied to the properties file on start.
    ///
    /// `port` is written as `server-port` and wins over an explicit
    /// `server-port` entry in `properties`.
    pub fn effective_properties(&self) -> PropertyOverlay {
        let mut overlay = self.properties.clone();
        if let Some(port) = self.port {
            overlay.set("server-port", port.to_string());
        }
        overlay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_args_order_memory_flags_target() {
        let config = ServerConfig::new("alpha", "/srv/alpha", LaunchTarget::jar("server.jar"))
            .with_memory(MemoryBounds::new(1024, 4096))
            .with_extra_flags(vec!["-XX:+UseG1GC".to_string()]);

        assert_eq!(
            config.launch_args(),
            vec!["-Xms1024M", "-Xmx4096M", "-XX:+UseG1GC", "-jar", "server.jar", "nogui"]
        );
    }

    #[test]
    fn script_launch_has_no_jar_flag() {
        let config = ServerConfig::new("beta", "/srv/beta", LaunchTarget::script("run.sh"))
            .with_executable("sh");
        assert_eq!(config.launch_args(), vec!["run.sh"]);
    }

    #[test]
    fn memory_bounds_are_normalised() {
        let bounds = MemoryBounds::new(4096, 512);
        assert_eq!(bounds.min_mb, 512);
        assert_eq!(bounds.max_mb, 4096);
    }

    #[test]
    fn port_overrides_explicit_server_port_property() {
        let mut props = PropertyOverlay::new();
        props.set("server-port", "1111");
        props.set("motd", "hello");
        let config = ServerConfig::new("gamma", "/srv/gamma", LaunchTarget::jar("server.jar"))
            .with_port(25570)
            .with_properties(props);

        let effective = config.effective_properties();
        assert_eq!(effective.get("server-port"), Some("25570"));
        assert_eq!(effective.get("motd"), Some("hello"));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let json = r#"{
            "id": "delta",
            "working_dir": "/srv/delta",
            "launch": { "target": "server.jar" }
        }"#;
        let config: ServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.executable, PathBuf::from("java"));
        assert_eq!(config.launch.kind, LaunchKind::Jar);
        assert_eq!(config.launch.args, vec!["nogui"]);
        assert!(config.properties.is_empty());
    }
}
