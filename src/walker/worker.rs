//! Worker thread logic for parallel directory walking
//!
//! Each worker:
//! - Pulls directory tasks from the work queue (its local overflow stack first)
//! - Lists the directory's immediate children
//! - Pushes accepted subdirectories back to the work queue
//! - Runs files through the filters and hands accepted ones to its batch assembler
//!
//! Listing failures become error items scoped to that directory; the worker
//! then moves on to the next task.

use crate::config::WalkConfig;
use crate::error::{TraversalError, WalkOutcome, WorkerError};
use crate::types::{Batch, FileEntry, WalkItem};
use crate::walker::batch::{BatchAssembler, ChannelClosed};
use crate::walker::cancel::CancelToken;
use crate::walker::queue::{
    DirTask, TaskGuard, TryRecv, WorkGuard, WorkQueueReceiver, WorkQueueSender,
};
use crossbeam_channel::Sender;
use std::fs::{self, Metadata};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Directories listed
    pub dirs_processed: AtomicU64,

    /// Entries emitted
    pub files_found: AtomicU64,

    /// Error items emitted
    pub errors: AtomicU64,

    /// Tasks not expanded (excluded roots, cancellation)
    pub skipped: AtomicU64,

    /// Batches handed to the delivery channel
    pub batches_sent: AtomicU64,
}

impl WorkerStats {
    fn record_dir(&self) {
        self.dirs_processed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_item(&self, item: &WalkItem) {
        match item {
            WalkItem::Entry(_) => self.files_found.fetch_add(1, Ordering::Relaxed),
            WalkItem::Error(_) => self.errors.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub(crate) fn record_batch(&self) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
    }
}

/// A worker thread that processes directory tasks
pub struct Worker {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<()>>,

    /// Worker statistics
    stats: Arc<WorkerStats>,
}

/// Everything a worker thread owns
pub struct WorkerContext {
    pub config: Arc<WalkConfig>,
    pub queue_rx: WorkQueueReceiver,
    pub queue_tx: WorkQueueSender,
    pub batch_tx: Sender<Batch>,
    pub cancel: CancelToken,
}

impl Worker {
    /// Spawn a new worker thread
    pub fn spawn(id: usize, ctx: WorkerContext) -> Result<Self, WorkerError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("walker-{}", id))
            .spawn(move || worker_loop(id, ctx, stats_clone))
            .map_err(|e| WorkerError::SpawnFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Wait for the worker to finish
    pub fn join(&mut self) -> Result<(), WorkerError> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| WorkerError::Panicked { id: self.id }),
            None => Ok(()),
        }
    }
}

/// Main worker loop
fn worker_loop(id: usize, ctx: WorkerContext, stats: Arc<WorkerStats>) {
    debug!(worker = id, "Worker starting");

    let WorkerContext {
        config,
        queue_rx,
        queue_tx,
        batch_tx,
        cancel,
    } = ctx;

    let mut out = BatchAssembler::new(
        batch_tx,
        config.batch_size,
        cancel.clone(),
        Arc::clone(&stats),
    );
    // Subdirectories that did not fit in the shared queue
    let mut local: Vec<DirTask> = Vec::new();

    loop {
        let task = match local.pop() {
            Some(task) => task,
            None => match queue_rx.try_recv() {
                TryRecv::Task(task) => task,
                TryRecv::Closed => break,
                TryRecv::Empty => {
                    // Going idle: let the consumer see what we have so far
                    if out.flush().is_err() {
                        cancel.cancel();
                    }
                    match queue_rx.recv() {
                        Some(task) => task,
                        None => break,
                    }
                }
            },
        };

        let _active = WorkGuard::new(&queue_rx);
        let _task = TaskGuard::new(&queue_tx);

        if cancel.is_cancelled() {
            stats.record_skip();
            continue;
        }

        let outcome = match process_task(&task, &config, &queue_tx, &mut local, &mut out, &cancel)
        {
            Ok(outcome) => outcome,
            Err(ChannelClosed) => {
                debug!(worker = id, "Walk cancelled, draining queue");
                cancel.cancel();
                continue;
            }
        };

        match outcome {
            WalkOutcome::Expanded {
                ref path,
                files,
                subdirs,
            } => {
                stats.record_dir();
                trace!(worker = id, path = %path, files, subdirs, "Directory processed");
            }
            WalkOutcome::Skipped { ref path, reason } => {
                stats.record_skip();
                trace!(worker = id, path = %path, reason, "Task skipped");
            }
            WalkOutcome::Failed { path, error } => {
                if error.is_vanished() {
                    debug!(worker = id, path = %path, "Path vanished");
                } else {
                    warn!(worker = id, path = %path, error = %error, "Directory failed");
                }
                if out.push(error).is_err() {
                    cancel.cancel();
                }
            }
        }
    }

    if out.flush().is_err() && !cancel.is_cancelled() {
        debug!(worker = id, "Final batch dropped, consumer gone");
    }

    debug!(
        worker = id,
        dirs = stats.dirs_processed.load(Ordering::Relaxed),
        files = stats.files_found.load(Ordering::Relaxed),
        errors = stats.errors.load(Ordering::Relaxed),
        "Worker finished"
    );
}

/// Process one task: classify a root, or expand a directory
fn process_task(
    task: &DirTask,
    config: &WalkConfig,
    queue_tx: &WorkQueueSender,
    local: &mut Vec<DirTask>,
    out: &mut BatchAssembler,
    cancel: &CancelToken,
) -> Result<WalkOutcome, ChannelClosed> {
    if !task.is_root() {
        return process_directory(task, config, queue_tx, local, out, cancel);
    }

    // Roots follow symlinks and may be plain files
    let metadata = match fs::metadata(&task.path) {
        Ok(metadata) => metadata,
        Err(e) => {
            return Ok(WalkOutcome::Failed {
                path: display(&task.path),
                error: TraversalError::stat(display(&task.path), &e),
            });
        }
    };

    if metadata.is_dir() {
        if !config.filters.accepts_root(&task.path, true) {
            return Ok(WalkOutcome::Skipped {
                path: display(&task.path),
                reason: "root excluded",
            });
        }
        return process_directory(task, config, queue_tx, local, out, cancel);
    }

    if metadata.is_file() && config.filters.accepts_root(&task.path, false) {
        emit_file(&task.path, config.include_metadata, || Ok(metadata), out)?;
        return Ok(WalkOutcome::Skipped {
            path: display(&task.path),
            reason: "file root",
        });
    }

    Ok(WalkOutcome::Skipped {
        path: display(&task.path),
        reason: "root filtered",
    })
}

/// List a directory and classify its immediate children
fn process_directory(
    task: &DirTask,
    config: &WalkConfig,
    queue_tx: &WorkQueueSender,
    local: &mut Vec<DirTask>,
    out: &mut BatchAssembler,
    cancel: &CancelToken,
) -> Result<WalkOutcome, ChannelClosed> {
    let entries = match fs::read_dir(&task.path) {
        Ok(entries) => entries,
        Err(e) => {
            return Ok(WalkOutcome::Failed {
                path: display(&task.path),
                error: TraversalError::read_dir(display(&task.path), &e),
            });
        }
    };

    let mut files = 0;
    let mut subdirs = 0;

    for entry in entries {
        if cancel.is_cancelled() {
            return Err(ChannelClosed);
        }

        let entry = match entry {
            Ok(entry) => entry,
            // The listing is abandoned; children seen so far stay reported
            Err(e) => {
                return Ok(WalkOutcome::Failed {
                    path: display(&task.path),
                    error: TraversalError::read_dir(display(&task.path), &e),
                });
            }
        };

        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                out.push(TraversalError::stat(display(&path), &e))?;
                continue;
            }
        };

        if file_type.is_dir() {
            if !config.filters.accepts_dir(&path) {
                continue;
            }
            subdirs += 1;
            match queue_tx.push(DirTask::new(path, task.depth + 1)) {
                Ok(None) => {}
                Ok(Some(overflow)) => {
                    trace!(path = %overflow.path.display(), "Backpressure - keeping task local");
                    local.push(overflow);
                }
                Err(()) => return Err(ChannelClosed),
            }
        } else if file_type.is_file() {
            if !config.filters.accepts_file(&path) {
                continue;
            }
            files += 1;
            emit_file(&path, config.include_metadata, || entry.metadata(), out)?;
        }
        // Symlinks and special files are neither followed nor reported
    }

    Ok(WalkOutcome::Expanded {
        path: display(&task.path),
        files,
        subdirs,
    })
}

/// Emit one accepted file, attaching timestamps if requested.
///
/// A failed stat still reports the entry (without timestamps), followed by
/// an error item for the same path.
fn emit_file<F>(
    path: &Path,
    include_metadata: bool,
    metadata: F,
    out: &mut BatchAssembler,
) -> Result<(), ChannelClosed>
where
    F: FnOnce() -> io::Result<Metadata>,
{
    let Some(path_str) = path.to_str() else {
        return out.push(TraversalError::InvalidUtf8 {
            path: display(path),
        });
    };

    if !include_metadata {
        return out.push(FileEntry::new(path_str.to_string()));
    }

    match metadata() {
        Ok(metadata) => out.push(FileEntry::with_metadata(path_str.to_string(), &metadata)),
        Err(e) => {
            out.push(FileEntry::new(path_str.to_string()))?;
            out.push(TraversalError::stat(path_str, &e))
        }
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Aggregate statistics from multiple workers: (dirs, files, errors, batches)
pub fn aggregate_stats<'a, I>(stats: I) -> (u64, u64, u64, u64)
where
    I: IntoIterator<Item = &'a WorkerStats>,
{
    let mut dirs = 0u64;
    let mut files = 0u64;
    let mut errors = 0u64;
    let mut batches = 0u64;

    for s in stats {
        dirs += s.dirs_processed.load(Ordering::Relaxed);
        files += s.files_found.load(Ordering::Relaxed);
        errors += s.errors.load(Ordering::Relaxed);
        batches += s.batches_sent.load(Ordering::Relaxed);
    }

    (dirs, files, errors, batches)
}
