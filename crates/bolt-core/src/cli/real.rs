use super::{BoltCli, CliOutput, CommandLine};
use crate::error::ProxyError;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Runs the Bolt binary directly on the host. Arguments go straight to the
/// process, no shell is involved.
#[derive(Debug, Default, Clone)]
pub struct RealBolt;

impl RealBolt {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BoltCli for RealBolt {
    async fn run(&self, command: &CommandLine) -> Result<CliOutput, ProxyError> {
        debug!("Local exec: {}", command.redacted());

        let output = Command::new(&command.program)
            .args(&command.args)
            .env("BOLT_GEM", "true")
            .env("BOLT_DISABLE_ANALYTICS", "true")
            .output()
            .await
            .map_err(|source| ProxyError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        // Killed by a signal: no exit code to report.
        let exit_code = output.status.code().unwrap_or(-1);

        Ok(CliOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code,
        })
    }
}
