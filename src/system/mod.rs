//! System module: external tool execution with timeouts
//!
//! Every external collaborator (unpacker, backport generator, 2to3, rg) runs
//! through [`run_tool`] so that output capture, timeouts and error reporting
//! behave the same way everywhere.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;

use crate::error::ToolError;

/// Captured result of a finished external tool
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    /// True when the tool exited with status 0
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, `None` when killed by a signal
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    /// Stderr decoded lossily and trimmed
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Human readable program name for diagnostics
pub fn describe(command: &Command) -> String {
    command.as_std().get_program().to_string_lossy().into_owned()
}

/// Run a command to completion, capturing stdout/stderr.
///
/// The child is killed if `timeout` elapses first. A non-zero exit status is
/// NOT an error here; see [`run_checked`] for that.
///
/// # Errors
/// `ToolError::Spawn` if the program cannot be started, `ToolError::TimedOut`
/// if it runs past `timeout`.
pub async fn run_tool(mut command: Command, timeout: Duration) -> Result<ToolOutput, ToolError> {
    let program = describe(&command);

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    log::debug!("[System] [EXEC] {:?}", command.as_std());

    let child = command.spawn().map_err(|source| ToolError::Spawn {
        program: program.clone(),
        source,
    })?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(ToolOutput {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        }),
        Ok(Err(source)) => Err(ToolError::Io { program, source }),
        Err(_) => {
            log::error!("[System] [EXEC] '{}' timed out after {:?}", program, timeout);
            Err(ToolError::TimedOut { program, timeout })
        }
    }
}

/// Like [`run_tool`], but a non-zero exit status becomes `ToolError::Failed`
pub async fn run_checked(command: Command, timeout: Duration) -> Result<ToolOutput, ToolError> {
    let program = describe(&command);
    let output = run_tool(command, timeout).await?;
    if output.success() {
        Ok(output)
    } else {
        Err(ToolError::Failed {
            program,
            code: output.code(),
            stderr: output.stderr_lossy(),
        })
    }
}
