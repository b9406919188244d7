//! webmux
//!
//! Unattended daemon that watches a directory for finished video files and
//! repackages each one into a web-friendly MP4, deleting the source on
//! success.

pub mod daemon;
pub mod exec;
pub mod jobs;
pub mod probe;
pub mod scan;
pub mod startup;
pub mod transcode;
pub mod watch;

pub use webmux_config as config;
pub use webmux_config::Config;

pub use daemon::{Daemon, DaemonError};
pub use exec::{run_tool, ToolError};
pub use jobs::{run_job, worker_loop, JobState, TranscodeJob};
pub use probe::{build_probe_command, parse_probe_report, probe_codecs, CodecSet, ProbeError};
pub use scan::{is_candidate_file, scan_watch_dir, INPUT_EXTENSIONS};
pub use startup::{
    check_tool_available, check_watch_dir, ensure_output_dir, run_startup_checks, StartupError,
};
pub use transcode::{
    build_ffmpeg_command, decide_audio, derive_output_path, run_transcode, AudioDecision,
    TranscodeError, TranscodeParams, AUDIO_BITRATE, OUTPUT_EXTENSION, TARGET_AUDIO_CODEC,
};
pub use watch::{is_completion_event, WatchError};
