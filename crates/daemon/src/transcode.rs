//! Transcode executor: repackages one input file into the web-friendly
//! target container.
//!
//! Video is always stream-copied; re-encoding it is the dominant cost and
//! never pays for itself here. Audio is stream-copied when the source is
//! already AAC and re-encoded at a fixed bitrate otherwise.

use crate::exec::{run_tool, stderr_excerpt, ToolError};
use crate::probe::CodecSet;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use thiserror::Error;
use tokio::process::Command;
use webmux_config::ToolsConfig;

/// Audio codec every output file ends up with.
pub const TARGET_AUDIO_CODEC: &str = "aac";

/// Fixed bitrate used when audio has to be re-encoded.
pub const AUDIO_BITRATE: &str = "192k";

/// Container extension of every output file.
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Error type for transcode operations.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// ffmpeg exited non-zero.
    #[error("ffmpeg exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    /// ffmpeg could not be launched or outlived its deadline.
    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// How the audio track is carried into the output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioDecision {
    /// Source audio is already the target codec; copy the stream.
    Copy,
    /// Re-encode to the target codec at the fixed bitrate.
    Reencode,
}

impl AudioDecision {
    pub fn as_str(&self) -> &str {
        match self {
            AudioDecision::Copy => "copy",
            AudioDecision::Reencode => "reencode",
        }
    }
}

/// Picks the audio handling for one file.
///
/// Stream-copy iff the probe found the target codec among the file's
/// codecs; otherwise re-encode. Pure, so the same CodecSet always yields
/// the same choice.
pub fn decide_audio(codecs: &CodecSet) -> AudioDecision {
    if codecs.contains(TARGET_AUDIO_CODEC) {
        AudioDecision::Copy
    } else {
        AudioDecision::Reencode
    }
}

/// Derives the output path for an input file: same base name, target
/// container extension, rebased into the output directory.
pub fn derive_output_path(input: &Path, out_dir: &Path) -> PathBuf {
    let file_name = input.file_name().map(Path::new).unwrap_or_else(|| Path::new(""));
    out_dir.join(file_name.with_extension(OUTPUT_EXTENSION))
}

/// Everything one ffmpeg invocation needs.
#[derive(Debug, Clone)]
pub struct TranscodeParams {
    /// Path to the input video file
    pub input_path: PathBuf,
    /// Path for the repackaged output file
    pub output_path: PathBuf,
    /// Audio handling decided from the probe result
    pub audio: AudioDecision,
}

impl TranscodeParams {
    /// Derive the parameters for one job from its probe result.
    pub fn new(input_path: &Path, codecs: &CodecSet, out_dir: &Path) -> Self {
        Self {
            input_path: input_path.to_path_buf(),
            output_path: derive_output_path(input_path, out_dir),
            audio: decide_audio(codecs),
        }
    }
}

/// Builds the ffmpeg invocation for one job.
///
/// Argument shape: `-y -i <input> -c:v copy -c:a copy|aac -b:a 192k <output>`.
/// The overwrite flag keeps a retried file from wedging on a stale partial
/// output.
pub fn build_ffmpeg_command(params: &TranscodeParams, tools: &ToolsConfig) -> Command {
    let mut cmd = Command::new(&tools.ffmpeg_bin);

    cmd.arg("-y");
    cmd.arg("-i").arg(&params.input_path);
    cmd.arg("-c:v").arg("copy");

    match params.audio {
        AudioDecision::Copy => {
            cmd.arg("-c:a").arg("copy");
        }
        AudioDecision::Reencode => {
            cmd.arg("-c:a").arg(TARGET_AUDIO_CODEC);
            cmd.arg("-b:a").arg(AUDIO_BITRATE);
        }
    }

    cmd.arg(&params.output_path);
    cmd
}

/// Runs the transcode invocation to completion.
///
/// Non-zero exit or a launch failure aborts the job; whatever partial
/// output ffmpeg left behind is the operator's to inspect.
pub async fn run_transcode(
    params: &TranscodeParams,
    tools: &ToolsConfig,
) -> Result<(), TranscodeError> {
    let cmd = build_ffmpeg_command(params, tools);
    let output = run_tool(cmd, tools.transcode_deadline()).await?;

    if !output.status.success() {
        return Err(TranscodeError::Failed {
            status: output.status,
            stderr: stderr_excerpt(&output),
        });
    }

    Ok(())
}
