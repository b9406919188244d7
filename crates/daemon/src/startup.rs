//! Startup checks: preflight validation before the watch begins.
//!
//! Everything here is fatal. A daemon that cannot see its watch directory,
//! create its output directory, or run its external tools cannot do any
//! useful work, so it refuses to start instead of failing on the first job.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use webmux_config::Config;

/// Error types for startup checks
#[derive(Debug, Error)]
pub enum StartupError {
    /// The watch directory is absent or not a directory.
    #[error("watch directory {0} does not exist or is not a directory")]
    WatchDirMissing(PathBuf),

    /// The output directory could not be created.
    #[error("failed to create output directory {dir}: {source}")]
    OutputDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An external tool could not be run.
    #[error("{tool} not available: {message}")]
    ToolUnavailable { tool: String, message: String },
}

/// Verify the watch directory exists.
pub fn check_watch_dir(dir: &Path) -> Result<(), StartupError> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(StartupError::WatchDirMissing(dir.to_path_buf()))
    }
}

/// Create the output directory if it does not exist yet.
pub fn ensure_output_dir(dir: &Path) -> Result<(), StartupError> {
    fs::create_dir_all(dir).map_err(|source| StartupError::OutputDir {
        dir: dir.to_path_buf(),
        source,
    })
}

/// Verify a tool runs at all by invoking `<tool> -version`.
pub fn check_tool_available(bin: &Path) -> Result<(), StartupError> {
    let tool = bin.display().to_string();

    let output = Command::new(bin).arg("-version").output().map_err(|e| {
        StartupError::ToolUnavailable {
            tool: tool.clone(),
            message: format!("failed to run {} -version; is it in PATH? Error: {}", tool, e),
        }
    })?;

    if !output.status.success() {
        return Err(StartupError::ToolUnavailable {
            tool: tool.clone(),
            message: format!("{} -version exited with {}", tool, output.status),
        });
    }

    Ok(())
}

/// Run all startup checks in order
///
/// Checks are run in the following order:
/// 1. Watch directory exists
/// 2. Output directory exists or is created
/// 3. ffprobe runs
/// 4. ffmpeg runs
pub fn run_startup_checks(config: &Config) -> Result<(), StartupError> {
    check_watch_dir(&config.watch_dir)?;
    ensure_output_dir(&config.out_dir)?;
    check_tool_available(&config.tools.ffprobe_bin)?;
    check_tool_available(&config.tools.ffmpeg_bin)?;
    Ok(())
}
