//! Launch command construction and pre-spawn checks.

use blockhost_core::{PROPERTIES_FILE, ServerConfig, SupervisorError, properties};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::debug;

/// Check that the working directory and the launch artifact exist.
pub fn verify_launch(config: &ServerConfig) -> Result<(), SupervisorError> {
    if !config.working_dir.is_dir() {
        return Err(SupervisorError::MissingArtifact {
            id: config.id.clone(),
            path: config.working_dir.clone(),
        });
    }

    let target = config.launch_path();
    if !target.exists() {
        return Err(SupervisorError::MissingArtifact {
            id: config.id.clone(),
            path: target,
        });
    }

    Ok(())
}

/// Merge the configured properties into `server.properties` before launch.
///
/// Does nothing when the configuration carries no properties.
pub fn sync_properties(config: &ServerConfig) -> Result<(), SupervisorError> {
    let overlay = config.effective_properties();
    if overlay.is_empty() {
        return Ok(());
    }
    let path = config.working_dir.join(PROPERTIES_FILE);
    properties::apply_overlay(&path, &overlay).map_err(|e| SupervisorError::io(&config.id, &e))?;
    Ok(())
}

/// Build the launch command.
///
/// All three stdio streams are piped. The child gets its own process group on
/// Unix so a Ctrl-C aimed at the supervisor does not reach it before the
/// graceful stop does.
pub fn build_command(config: &ServerConfig) -> Command {
    let mut std_cmd = std::process::Command::new(&config.executable);
    std_cmd
        .current_dir(&config.working_dir)
        .args(config.launch_args())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        std_cmd.process_group(0);
    }

    let mut cmd = Command::from(std_cmd);
    cmd.kill_on_drop(true);
    cmd
}

/// Spawn the server process.
pub fn spawn(config: &ServerConfig) -> Result<Child, SupervisorError> {
    debug!(
        server_id = %config.id,
        executable = %config.executable.display(),
        args = ?config.launch_args(),
        "Spawning server"
    );
    build_command(config)
        .spawn()
        .map_err(|e| SupervisorError::SpawnFailure {
            id: config.id.clone(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockhost_core::{LaunchTarget, PropertyOverlay, properties::read_properties};

    #[test]
    fn missing_working_dir_is_missing_artifact() {
        let config = ServerConfig::new(
            "alpha",
            "/definitely/not/here",
            LaunchTarget::jar("server.jar"),
        );
        let err = verify_launch(&config).unwrap_err();
        assert!(matches!(err, SupervisorError::MissingArtifact { path, .. } if path.ends_with("here")));
    }

    #[test]
    fn missing_jar_is_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::new("alpha", dir.path(), LaunchTarget::jar("server.jar"));
        let err = verify_launch(&config).unwrap_err();
        assert!(
            matches!(err, SupervisorError::MissingArtifact { path, .. } if path.ends_with("server.jar"))
        );
    }

    #[test]
    fn present_artifacts_pass() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("server.jar"), b"jar").unwrap();
        let config = ServerConfig::new("alpha", dir.path(), LaunchTarget::jar("server.jar"));
        assert!(verify_launch(&config).is_ok());
    }

    #[test]
    fn sync_properties_writes_port_and_overlay() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PROPERTIES_FILE), "motd=old\npvp=true\n").unwrap();

        let mut overlay = PropertyOverlay::new();
        overlay.set("motd", "new");
        let config = ServerConfig::new("alpha", dir.path(), LaunchTarget::jar("server.jar"))
            .with_port(25566)
            .with_properties(overlay);

        sync_properties(&config).unwrap();

        let written = read_properties(&dir.path().join(PROPERTIES_FILE)).unwrap();
        assert_eq!(written.get("motd"), Some("new"));
        assert_eq!(written.get("pvp"), Some("true"));
        assert_eq!(written.get("server-port"), Some("25566"));
    }

    #[test]
    fn sync_properties_without_overlay_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::new("alpha", dir.path(), LaunchTarget::jar("server.jar"));
        sync_properties(&config).unwrap();
        assert!(!dir.path().join(PROPERTIES_FILE).exists());
    }

    #[tokio::test]
    async fn spawn_failure_for_unknown_executable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("server.jar"), b"jar").unwrap();
        let config = ServerConfig::new("alpha", dir.path(), LaunchTarget::jar("server.jar"))
            .with_executable("/nonexistent/blockhost-java");
        let err = spawn(&config).unwrap_err();
        assert!(matches!(err, SupervisorError::SpawnFailure { .. }));
    }
}
