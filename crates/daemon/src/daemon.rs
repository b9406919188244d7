//! Daemon startup and main loop for webmux
//!
//! Ties the pieces together: startup checks, the bounded job queue, the
//! worker pool, the initial scan, and the watch subscription.

use crate::jobs::{worker_loop, SharedReceiver};
use crate::scan;
use crate::startup::{run_startup_checks, StartupError};
use crate::watch::{self, WatchError};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use webmux_config::{Config, ConfigError};

/// Error type for daemon operations
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Startup check failed
    #[error("Startup check failed: {0}")]
    Startup(#[from] StartupError),

    /// Watch subscription failed
    #[error("Watch subscription failed: {0}")]
    Watch(#[from] WatchError),
}

/// Daemon state: the configuration and both ends of the job queue.
///
/// The queue is the only thing shared between the watcher and the workers;
/// everything per-job stays on the worker that received the path.
#[derive(Debug)]
pub struct Daemon {
    config: Arc<Config>,
    job_tx: mpsc::Sender<PathBuf>,
    job_rx: SharedReceiver,
}

impl Daemon {
    /// Initialize the daemon: run the startup checks, then create the
    /// bounded job queue. Any check failure aborts startup.
    pub fn new(config: Config) -> Result<Self, DaemonError> {
        run_startup_checks(&config)?;
        Ok(Self::new_without_checks(config))
    }

    /// Initialize the daemon without running startup checks.
    ///
    /// Useful for testing when the external tools are stubbed or absent.
    pub fn new_without_checks(config: Config) -> Self {
        let capacity = config.jobs.queue_capacity.max(1);
        let (job_tx, job_rx) = mpsc::channel(capacity);

        Self {
            config: Arc::new(config),
            job_tx,
            job_rx: Arc::new(Mutex::new(job_rx)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a clone of the job sender for external submission
    pub fn job_sender(&self) -> mpsc::Sender<PathBuf> {
        self.job_tx.clone()
    }

    /// Spawn the fixed worker pool. Workers run until the queue closes.
    pub fn spawn_workers(&self) -> Vec<tokio::task::JoinHandle<()>> {
        (1..=self.config.jobs.max_jobs)
            .map(|id| tokio::spawn(worker_loop(id, self.job_rx.clone(), self.config.clone())))
            .collect()
    }

    /// Queue every candidate file already sitting in the watch directory.
    ///
    /// Files that arrived while the daemon was down produce no events, so
    /// the watcher alone would never see them. A scan failure is logged
    /// and the sweep skipped; the watch still covers everything new.
    pub async fn enqueue_initial_files(&self) {
        match scan::scan_watch_dir(&self.config.watch_dir) {
            Ok(paths) => {
                info!(
                    dir = %self.config.watch_dir.display(),
                    count = paths.len(),
                    "initial scan complete"
                );
                for path in paths {
                    debug!(path = %path.display(), "queuing pre-existing file");
                    if self.job_tx.send(path).await.is_err() {
                        break;
                    }
                }
            }
            Err(err) => {
                warn!(
                    dir = %self.config.watch_dir.display(),
                    error = %err,
                    "initial scan failed, relying on watch events only"
                );
            }
        }
    }

    /// Run the daemon until a shutdown signal arrives.
    ///
    /// Order matters: workers first so the bounded queue drains, then the
    /// initial scan (which blocks on the queue when it fills), then the
    /// watch subscription, which lives until the process exits.
    pub async fn run(&self) -> Result<(), DaemonError> {
        let _workers = self.spawn_workers();

        self.enqueue_initial_files().await;

        let _watcher = watch::start(&self.config.watch_dir, self.job_tx.clone())?;
        info!(
            dir = %self.config.watch_dir.display(),
            out_dir = %self.config.out_dir.display(),
            workers = self.config.jobs.max_jobs,
            "watching for video files"
        );

        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(err) => warn!(error = %err, "failed to listen for shutdown signal"),
        }

        Ok(())
    }
}
