//! Shared subprocess helpers for the one-shot tools (rustfmt, rustsym, racer).

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use ferrule_types::ToolEnvironment;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time;

use crate::types::ToolchainError;

/// Resolve a configured binary (bare name or path) to an executable.
pub(crate) fn locate(tool: &'static str, binary: &str) -> Result<PathBuf, ToolchainError> {
    which::which(binary).map_err(|source| ToolchainError::NotFound {
        tool,
        binary: binary.to_string(),
        source,
    })
}

pub(crate) struct CapturedOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    /// `Failed` unless the process exited successfully.
    pub fn check(self, tool: &'static str) -> Result<Self, ToolchainError> {
        if self.status.success() {
            return Ok(self);
        }
        Err(ToolchainError::Failed {
            tool,
            status: self.status.to_string(),
            stderr: self.stderr.trim().to_string(),
        })
    }
}

/// Run a tool to completion and capture its output.
pub(crate) struct Invocation<'a> {
    pub tool: &'static str,
    pub binary: &'a str,
    pub args: Vec<String>,
    pub cwd: &'a Path,
    pub env: &'a ToolEnvironment,
    pub stdin: Option<String>,
    pub timeout: Duration,
}

impl Invocation<'_> {
    pub async fn run(self) -> Result<CapturedOutput, ToolchainError> {
        let tool = self.tool;
        let program = locate(tool, self.binary)?;

        let mut cmd = Command::new(&program);
        cmd.args(&self.args)
            .current_dir(self.cwd)
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in self.env.snapshot() {
            cmd.env(key, value);
        }

        tracing::debug!(tool, program = %program.display(), args = ?self.args, "Spawning");
        let mut child = cmd
            .spawn()
            .map_err(|source| ToolchainError::Spawn { tool, source })?;

        if let Some(input) = self.stdin
            && let Some(mut stdin) = child.stdin.take()
        {
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    tracing::debug!(tool, "Failed to write stdin: {e}");
                }
            });
        }

        let seconds = self.timeout.as_secs();
        let output = time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ToolchainError::Timeout { tool, seconds })?
            .map_err(|source| ToolchainError::Io { tool, source })?;

        Ok(CapturedOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
