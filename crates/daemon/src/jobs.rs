//! Per-job pipeline and the worker pool that drives it.
//!
//! Each worker owns one job at a time and runs it straight through:
//! probe, decide, transcode, delete the source. Failures are terminal for
//! the job, logged, and never retried; the worker moves on to the next
//! path. Nothing a single bad file does can take a worker down.

use crate::probe::probe_codecs;
use crate::transcode::{run_transcode, TranscodeParams};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;
use webmux_config::Config;

/// Receiver end of the job queue, shared by all workers.
pub type SharedReceiver = Arc<Mutex<mpsc::Receiver<PathBuf>>>;

/// Job state representing the current stage in the pipeline.
///
/// `ProbeFailed`, `TranscodeFailed` and `CleanupFailed` are terminal; a job
/// reaching one of them is abandoned, with the source file left in place
/// (for cleanup failures the output exists too).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    /// Path received from the queue, nothing run yet.
    Discovered,
    /// Codec inspection in progress.
    Probing,
    /// Probe failed; job abandoned.
    ProbeFailed(String),
    /// Codec decision made, transcode not yet started.
    Decided,
    /// External transcode in progress.
    Transcoding,
    /// Transcode failed; source retained.
    TranscodeFailed(String),
    /// Output produced, source not yet deleted.
    Transcoded,
    /// Source deletion failed; output and source both remain.
    CleanupFailed(String),
    /// Output produced and source deleted.
    Done,
}

impl JobState {
    /// Convert state to string for log fields
    pub fn as_str(&self) -> &str {
        match self {
            JobState::Discovered => "discovered",
            JobState::Probing => "probing",
            JobState::ProbeFailed(_) => "probe_failed",
            JobState::Decided => "decided",
            JobState::Transcoding => "transcoding",
            JobState::TranscodeFailed(_) => "transcode_failed",
            JobState::Transcoded => "transcoded",
            JobState::CleanupFailed(_) => "cleanup_failed",
            JobState::Done => "done",
        }
    }

    /// The failure message of a terminal failure state, if any.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            JobState::ProbeFailed(reason)
            | JobState::TranscodeFailed(reason)
            | JobState::CleanupFailed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// One file's trip through the pipeline. Local to a single worker.
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    /// Identifier used only for log correlation
    pub id: Uuid,
    /// Path to the source file
    pub input_path: PathBuf,
    /// Derived output path, known once the codec decision is made
    pub output_path: Option<PathBuf>,
    /// Current state of the job
    pub state: JobState,
}

impl TranscodeJob {
    pub fn new(input_path: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4(),
            input_path,
            output_path: None,
            state: JobState::Discovered,
        }
    }
}

/// Runs one job end to end and returns it in a terminal state.
///
/// Stage order is strict: the probe completes before the transcode starts,
/// and the transcode completes before the source is deleted. The first
/// failure ends the job; the source file is only ever deleted after a
/// successful transcode.
pub async fn run_job(input_path: PathBuf, config: &Config) -> TranscodeJob {
    let mut job = TranscodeJob::new(input_path);

    job.state = JobState::Probing;
    debug!(job = %job.id, input = %job.input_path.display(), "probing codecs");

    let codecs = match probe_codecs(&job.input_path, &config.tools).await {
        Ok(codecs) => codecs,
        Err(err) => {
            job.state = JobState::ProbeFailed(err.to_string());
            return job;
        }
    };

    job.state = JobState::Decided;
    let params = TranscodeParams::new(&job.input_path, &codecs, &config.out_dir);
    job.output_path = Some(params.output_path.clone());
    info!(
        job = %job.id,
        input = %job.input_path.display(),
        codecs = %codecs,
        audio = params.audio.as_str(),
        "transcoding"
    );

    job.state = JobState::Transcoding;
    if let Err(err) = run_transcode(&params, &config.tools).await {
        job.state = JobState::TranscodeFailed(err.to_string());
        return job;
    }

    job.state = JobState::Transcoded;
    if let Err(err) = tokio::fs::remove_file(&job.input_path).await {
        job.state = JobState::CleanupFailed(err.to_string());
        return job;
    }

    job.state = JobState::Done;
    job
}

/// One worker's infinite loop: take a path from the shared queue, run the
/// job, log the outcome, repeat. Exits when the queue closes.
pub async fn worker_loop(worker_id: u32, rx: SharedReceiver, config: Arc<Config>) {
    info!(worker = worker_id, "worker started");

    loop {
        // Hold the lock only for the receive; the job itself runs unlocked
        // so the other workers can keep draining the queue.
        let next = { rx.lock().await.recv().await };

        let Some(path) = next else {
            info!(worker = worker_id, "job queue closed, worker exiting");
            break;
        };

        let job = run_job(path, &config).await;
        match &job.state {
            JobState::Done => {
                let output = job
                    .output_path
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                info!(worker = worker_id, job = %job.id, output = %output, "finished");
            }
            state => {
                warn!(
                    worker = worker_id,
                    job = %job.id,
                    input = %job.input_path.display(),
                    state = state.as_str(),
                    reason = state.failure_reason().unwrap_or("unknown"),
                    "job abandoned"
                );
            }
        }
    }
}
