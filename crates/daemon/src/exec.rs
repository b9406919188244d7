//! Shared subprocess discipline for the external media tools.
//!
//! Both ffprobe and ffmpeg are run through here: output captured, an
//! optional deadline enforced, and the child killed if the deadline expires.

use std::process::{Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Error type for tool invocations that never produced an exit status.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The process could not be launched.
    #[error("failed to launch tool: {0}")]
    Spawn(#[from] std::io::Error),

    /// The process outlived its deadline and was killed.
    #[error("tool exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

/// Run a tool to completion, capturing stdout and stderr.
///
/// When `deadline` is `Some`, the invocation is abandoned once it expires
/// and the child is killed. Exit-status interpretation is left to the
/// caller; only launch failures and deadline expiry are errors here.
pub async fn run_tool(mut cmd: Command, deadline: Option<Duration>) -> Result<Output, ToolError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    match deadline {
        Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ToolError::DeadlineExceeded(limit)),
        },
        None => Ok(cmd.output().await?),
    }
}

/// Trimmed stderr of a finished invocation, for error messages.
pub fn stderr_excerpt(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}
