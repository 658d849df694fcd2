//! Process-inspection collaborator
//!
//! The start-command checks need to know whether a container image has a CMD
//! baked in, which means shelling out to the container runtime. That call is
//! isolated behind [`CommandRunner`] so tests can substitute a fake and so
//! the deadline is enforced in one place. A timeout or runner failure is
//! inconclusive, never fatal.

use crate::error::{Result, StevedoreError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;

/// Outcome of an external process invocation
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
}

impl CommandOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs an external command with a bounded timeout
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}

/// [`CommandRunner`] backed by a real child process
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let child = Command::new(program).args(args).output();
        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| {
                StevedoreError::DeadlineExceeded(format!("running '{program}' for inspection"))
            })??;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

/// Whether `image` has a CMD baked in, inspected through the container
/// runtime. `None` means the check was inconclusive (runtime missing, image
/// not present locally, timeout, unparseable output).
pub async fn image_has_cmd(runner: &dyn CommandRunner, image: &str) -> Option<bool> {
    let version = runner.run("docker", &["version", "--format", "{{.Client.Version}}"]).await;
    match version {
        Ok(output) if output.succeeded() => {}
        _ => {
            tracing::debug!(image, "container runtime unavailable, CMD check inconclusive");
            return None;
        }
    }

    let inspect = runner
        .run(
            "docker",
            &["image", "inspect", image, "--format", "{{json .Config.Cmd}}"],
        )
        .await;
    let output = match inspect {
        Ok(output) if output.succeeded() && !output.stdout.trim().is_empty() => output,
        _ => {
            tracing::debug!(image, "image not inspectable locally, CMD check inconclusive");
            return None;
        }
    };

    match serde_json::from_str::<serde_json::Value>(output.stdout.trim()) {
        Ok(serde_json::Value::Array(cmd)) => Some(!cmd.is_empty()),
        Ok(serde_json::Value::Null) => Some(false),
        _ => None,
    }
}
