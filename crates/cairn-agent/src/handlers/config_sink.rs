//! Configuration file sink with systemd restarts

use async_trait::async_trait;
use cairn_core::effects::{ConfigSinkEffects, RestartMode, SinkError};
use cairn_core::RenderedConfig;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;

/// Rendered configuration is installed read-only
#[cfg(unix)]
const CONFIG_MODE: u32 = 0o444;

/// Writes rendered configuration to disk and restarts the database service
#[derive(Debug, Clone)]
pub struct FileConfigSink {
    config_path: PathBuf,
    restart_command: Vec<String>,
}

impl FileConfigSink {
    /// Sink writing to `config_path` and restarting `service_name` via systemd
    pub fn new(config_path: impl Into<PathBuf>, service_name: &str) -> Self {
        Self {
            config_path: config_path.into(),
            restart_command: vec![
                "systemctl".to_string(),
                "restart".to_string(),
                service_name.to_string(),
            ],
        }
    }

    /// Replace the restart command; the first element is the program
    pub fn with_restart_command(mut self, command: Vec<String>) -> Self {
        self.restart_command = command;
        self
    }

    /// Path the configuration is written to
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

#[async_trait]
impl ConfigSinkEffects for FileConfigSink {
    async fn apply(&self, config: &RenderedConfig) -> Result<(), SinkError> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SinkError::new(format!("Failed to create directory: {e}")))?;
        }

        let tmp_path = self.config_path.with_extension("cairn-tmp");
        fs::write(&tmp_path, config.content())
            .await
            .map_err(|e| SinkError::new(format!("Failed to write configuration: {e}")))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(CONFIG_MODE))
                .await
                .map_err(|e| SinkError::new(format!("Failed to set permissions: {e}")))?;
        }

        fs::rename(&tmp_path, &self.config_path)
            .await
            .map_err(|e| SinkError::new(format!("Failed to install configuration: {e}")))?;

        tracing::info!(
            path = %self.config_path.display(),
            fingerprint = %config.fingerprint(),
            "configuration written"
        );
        Ok(())
    }

    async fn restart(&self, mode: RestartMode) -> Result<(), SinkError> {
        let (program, args) = self
            .restart_command
            .split_first()
            .ok_or_else(|| SinkError::new("restart command is empty"))?;

        tracing::info!(?mode, command = ?self.restart_command, "restarting database service");
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| SinkError::new(format!("Failed to run {program}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SinkError::new(format!(
                "{program} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}
