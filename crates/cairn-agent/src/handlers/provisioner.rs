//! Provisioning through an external command

use async_trait::async_trait;
use cairn_core::effects::{GrantRequest, ProvisionError, ProvisioningEffects};
use cairn_core::{CairnError, CairnResult, Password};
use tokio::process::Command;

/// Runs `<command> <hostname> <database> <username> [--admin]` per grant.
///
/// The command creates the database and grant if needed and prints the
/// user's password on stdout. It must return the same password for the same
/// grant every time.
#[derive(Debug, Clone)]
pub struct CommandProvisioner {
    program: String,
    args: Vec<String>,
}

impl CommandProvisioner {
    /// Parse a whitespace separated command line
    pub fn from_command_line(command: &str) -> CairnResult<Self> {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words
            .next()
            .ok_or_else(|| CairnError::config("provision command is empty"))?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }

    fn argv(&self, grant: &GrantRequest) -> Vec<String> {
        let mut argv = self.args.clone();
        argv.extend([
            grant.hostname.clone(),
            grant.database.clone(),
            grant.username.clone(),
        ]);
        if grant.admin {
            argv.push("--admin".to_string());
        }
        argv
    }
}

#[async_trait]
impl ProvisioningEffects for CommandProvisioner {
    async fn provision(&self, grant: &GrantRequest) -> Result<Password, ProvisionError> {
        tracing::debug!(
            database = %grant.database,
            username = %grant.username,
            hostname = %grant.hostname,
            admin = grant.admin,
            "provisioning grant"
        );
        let output = Command::new(&self.program)
            .args(self.argv(grant))
            .output()
            .await
            .map_err(|e| grant.failed(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(grant.failed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| grant.failed("password is not valid UTF-8"))?;
        let password = stdout.trim();
        if password.is_empty() {
            return Err(grant.failed("no password returned"));
        }
        Ok(Password::new(password))
    }
}

/// Stand-in used when no provision command is configured; every grant fails
#[derive(Debug, Clone, Default)]
pub struct DisabledProvisioner;

#[async_trait]
impl ProvisioningEffects for DisabledProvisioner {
    async fn provision(&self, grant: &GrantRequest) -> Result<Password, ProvisionError> {
        Err(grant.failed("no provision command configured"))
    }
}
