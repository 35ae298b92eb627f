//! Walk coordinator - sets up and starts the parallel filesystem walk
//!
//! The coordinator is responsible for:
//! - Creating the work queue, delivery channel and cancellation token
//! - Seeding one work item per root
//! - Spawning the worker pool
//! - Handing the consumer a [`WalkStream`]

use crate::config::WalkConfig;
use crate::error::{Result, WorkerError};
use crate::types::Batch;
use crate::walker::cancel::CancelToken;
use crate::walker::queue::WorkQueue;
use crate::walker::stream::WalkStream;
use crate::walker::worker::{Worker, WorkerContext};
use crossbeam_channel::bounded;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Coordinates the parallel filesystem walk
pub struct WalkCoordinator {
    /// Configuration
    config: Arc<WalkConfig>,

    /// Work queue for directory tasks
    queue: WorkQueue,

    /// Shutdown signal
    cancel: CancelToken,
}

impl WalkCoordinator {
    /// Create a new walk coordinator
    pub fn new(config: WalkConfig) -> Self {
        // No roots, no workers
        let worker_count = if config.roots.is_empty() {
            0
        } else {
            config.worker_count
        };
        let queue = WorkQueue::new(config.queue_size, worker_count);

        Self {
            config: Arc::new(config),
            queue,
            cancel: CancelToken::new(),
        }
    }

    /// Get a clone of the cancellation token (for signal handlers)
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Start the walk and return the consumer end
    pub fn start(self) -> Result<WalkStream> {
        let started = Instant::now();
        let (batch_tx, batch_rx) = bounded::<Batch>(self.config.channel_capacity);

        if self.config.roots.is_empty() {
            // Dropping the only sender ends the stream immediately
            drop(batch_tx);
            return Ok(WalkStream::new(
                batch_rx,
                Vec::new(),
                self.queue,
                self.cancel,
                self.config.lightweight,
                started,
            ));
        }

        info!(
            roots = self.config.roots.len(),
            workers = self.config.worker_count,
            batch_size = self.config.batch_size,
            "Starting filesystem walk"
        );

        self.queue
            .seed(&self.config.roots)
            .map_err(|_| WorkerError::SpawnFailed {
                id: 0,
                reason: "work queue rejected root tasks".into(),
            })?;

        let mut workers = Vec::with_capacity(self.config.worker_count);
        for id in 0..self.config.worker_count {
            let ctx = WorkerContext {
                config: Arc::clone(&self.config),
                queue_rx: self.queue.receiver(),
                queue_tx: self.queue.sender(),
                batch_tx: batch_tx.clone(),
                cancel: self.cancel.clone(),
            };
            match Worker::spawn(id, ctx) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    // Spawned workers drain the queue without expanding and exit
                    self.cancel.cancel();
                    drop(batch_rx);
                    for mut worker in workers {
                        if let Err(join_err) = worker.join() {
                            warn!(error = %join_err, "Worker failed to join cleanly");
                        }
                    }
                    return Err(e.into());
                }
            }
        }

        // Workers hold the remaining senders; the stream ends when they all exit
        drop(batch_tx);

        info!(count = workers.len(), "Workers spawned");

        Ok(WalkStream::new(
            batch_rx,
            workers,
            self.queue,
            self.cancel,
            self.config.lightweight,
            started,
        ))
    }
}
