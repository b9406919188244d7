//! Codec inspector: determines which codecs a media file uses.
//!
//! Runs ffprobe against the file, asking for one `codec_name=<value>` line
//! per stream, and parses that report line by line. The transcode decision
//! only needs codec membership, so nothing else is requested.

use crate::exec::{run_tool, stderr_excerpt, ToolError};
use regex::Regex;
use std::path::Path;
use std::process::ExitStatus;
use std::sync::OnceLock;
use thiserror::Error;
use tokio::process::Command;
use webmux_config::ToolsConfig;

/// Error type for probe operations.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// ffprobe exited non-zero.
    #[error("ffprobe exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    /// A report line did not carry a well-formed codec name.
    #[error("failed to parse ffprobe report: {0}")]
    Parse(String),

    /// ffprobe could not be launched or outlived its deadline.
    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// The codecs of one media file, in probe-report order (video streams
/// first, then audio, as ffprobe emits them).
///
/// Order is preserved for logging; membership tests ignore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecSet(Vec<String>);

impl CodecSet {
    /// True iff the named codec appears in the set.
    pub fn contains(&self, codec: &str) -> bool {
        self.0.iter().any(|name| name.eq_ignore_ascii_case(codec))
    }

    /// Codec names in report order.
    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for CodecSet {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl std::fmt::Display for CodecSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

fn codec_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^codec_name=([0-9A-Za-z_.\-]+)$").expect("codec line pattern is valid")
    })
}

/// Builds the ffprobe invocation for one file.
///
/// `-of default=noprint_wrappers=1` keeps the report to bare
/// `codec_name=<value>` lines, one per stream.
pub fn build_probe_command(path: &Path, tools: &ToolsConfig) -> Command {
    let mut cmd = Command::new(&tools.ffprobe_bin);
    cmd.arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("stream=codec_name")
        .arg("-of")
        .arg("default=noprint_wrappers=1")
        .arg(path);
    cmd
}

/// Parses a probe report into a CodecSet.
///
/// Every non-empty line must be a well-formed `codec_name=` line; one that
/// is not is a parse error, never a silently skipped line. An empty report
/// (no streams) is a valid empty set.
pub fn parse_probe_report(report: &str) -> Result<CodecSet, ProbeError> {
    let mut codecs = Vec::new();

    for line in report.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        match codec_line_pattern().captures(line) {
            Some(caps) => codecs.push(caps[1].to_string()),
            None => {
                return Err(ProbeError::Parse(format!(
                    "expected codec_name line, got {:?}",
                    line
                )))
            }
        }
    }

    Ok(CodecSet(codecs))
}

/// Probes a media file and returns its codec set.
pub async fn probe_codecs(path: &Path, tools: &ToolsConfig) -> Result<CodecSet, ProbeError> {
    let cmd = build_probe_command(path, tools);
    let output = run_tool(cmd, tools.probe_deadline()).await?;

    if !output.status.success() {
        return Err(ProbeError::Failed {
            status: output.status,
            stderr: stderr_excerpt(&output),
        });
    }

    parse_probe_report(&String::from_utf8_lossy(&output.stdout))
}
