//! Directory watcher: bridges filesystem notifications into the job queue.
//!
//! Only two event kinds qualify a path: close-after-write and moved/renamed
//! into the directory. A create or open event means the file may still be
//! mid-write, so those never enqueue anything. Qualifying paths are pushed
//! into the bounded job queue with a blocking send from the notification
//! thread; when the queue is full, event processing stalls until a worker
//! frees a slot. That backpressure bounds memory under a burst of incoming
//! files and must stay.

use crate::scan;
use notify::event::{AccessKind, AccessMode, EventKind, ModifyKind, RenameMode};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Error type for establishing the watch subscription. Both variants are
/// fatal: without the subscription the daemon cannot do its job.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The platform watcher could not be created.
    #[error("failed to create filesystem watcher: {0}")]
    Init(#[source] notify::Error),

    /// The watch on the target directory could not be established.
    #[error("failed to watch {dir}: {source}")]
    Subscribe {
        dir: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// True for the two event kinds that mean "this file is complete":
/// closed after being open for writing, or moved/renamed into the
/// directory.
pub fn is_completion_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Access(AccessKind::Close(AccessMode::Write))
            | EventKind::Modify(ModifyKind::Name(RenameMode::To))
    )
}

/// Starts watching `watch_dir` (non-recursive), feeding qualifying paths
/// into `tx`.
///
/// The returned watcher is the subscription; dropping it ends the watch,
/// so the caller keeps it alive for the life of the process. Event-level
/// errors after startup are logged and ignored.
pub fn start(watch_dir: &Path, tx: mpsc::Sender<PathBuf>) -> Result<RecommendedWatcher, WatchError> {
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                if !is_completion_event(&event.kind) {
                    return;
                }
                for path in event.paths {
                    if !scan::is_candidate_file(&path) {
                        continue;
                    }
                    debug!(path = %path.display(), "queuing");
                    if tx.blocking_send(path).is_err() {
                        warn!("job queue closed, dropping event");
                    }
                }
            }
            Err(err) => warn!(error = %err, "watch event error"),
        },
        notify::Config::default(),
    )
    .map_err(WatchError::Init)?;

    watcher
        .watch(watch_dir, RecursiveMode::NonRecursive)
        .map_err(|source| WatchError::Subscribe {
            dir: watch_dir.to_path_buf(),
            source,
        })?;

    Ok(watcher)
}
