//! Consumer side of the delivery channel
//!
//! Two read disciplines sit on the same bounded channel:
//! - Pull: [`WalkStream::next_batch`] (or the `Iterator` impl) blocks until a
//!   batch is ready and returns `None` once the walk is exhausted.
//! - Push: [`PushHandle`] runs a delivery thread that calls back with
//!   `Some(batch)` for each batch and a final `None`.
//!
//! Both read from a channel holding at most `channel_capacity` batches, so a
//! slow consumer stalls the workers either way.

use crate::error::{Result, WorkerError};
use crate::types::Batch;
use crate::walker::cancel::CancelToken;
use crate::walker::queue::WorkQueue;
use crate::walker::worker::{aggregate_stats, Worker};
use crossbeam_channel::{select, Receiver};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Final statistics of one walk
#[derive(Debug, Clone, Default)]
pub struct WalkStats {
    /// Directories listed
    pub dirs: u64,

    /// Entries emitted
    pub files: u64,

    /// Error items emitted
    pub errors: u64,

    /// Batches produced
    pub batches: u64,

    /// Directories handed to other workers through the shared queue
    pub dirs_queued: u64,

    /// Directories kept local because the shared queue was full
    pub backpressure_events: u64,

    /// Time from start until the stream was finished
    pub duration: Duration,

    /// Whether the walk ran to exhaustion (vs was cancelled)
    pub completed: bool,
}

impl WalkStats {
    /// Entries per second over the whole walk
    pub fn files_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.files as f64 / secs
        } else {
            0.0
        }
    }
}

/// Live snapshot for progress display
#[derive(Debug, Clone, Default)]
pub struct WalkProgress {
    pub dirs: u64,
    pub files: u64,
    pub errors: u64,
    pub batches: u64,

    /// Work items queued or being expanded
    pub pending: usize,

    pub queued: u64,
    pub backpressure_events: u64,

    pub active_workers: usize,
    pub total_workers: usize,
    pub elapsed: Duration,
}

impl WalkProgress {
    /// Calculate files per second rate
    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.files as f64 / secs
        } else {
            0.0
        }
    }
}

/// Pull-style handle on a running walk
///
/// Dropping the stream cancels the walk; workers notice between work items
/// (or immediately, if blocked on a full channel) and exit.
pub struct WalkStream {
    receiver: Option<Receiver<Batch>>,
    workers: Vec<Worker>,
    queue: WorkQueue,
    cancel: CancelToken,
    lightweight: bool,
    started: Instant,
    exhausted: bool,
}

impl WalkStream {
    pub(crate) fn new(
        receiver: Receiver<Batch>,
        workers: Vec<Worker>,
        queue: WorkQueue,
        cancel: CancelToken,
        lightweight: bool,
        started: Instant,
    ) -> Self {
        Self {
            receiver: Some(receiver),
            workers,
            queue,
            cancel,
            lightweight,
            started,
            exhausted: false,
        }
    }

    /// Block until the next batch is ready.
    ///
    /// Returns `None` once every worker has exited, or after cancellation.
    /// Every returned batch is non-empty.
    pub fn next_batch(&mut self) -> Option<Batch> {
        let receiver = self.receiver.as_ref()?;
        if self.cancel.is_cancelled() {
            self.receiver = None;
            return None;
        }

        let next = select! {
            recv(receiver) -> msg => msg.ok(),
            recv(self.cancel.signal()) -> _ => None,
        };

        if next.is_none() {
            if !self.cancel.is_cancelled() {
                self.exhausted = true;
            }
            self.receiver = None;
        }
        next
    }

    /// Abandon the walk. Batches already buffered are discarded.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this walk (for signal handlers)
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Check whether batches should skip encoding
    pub fn is_lightweight(&self) -> bool {
        self.lightweight
    }

    /// Check whether the terminal marker has been returned
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Get current progress
    pub fn progress(&self) -> WalkProgress {
        let (dirs, files, errors, batches) =
            aggregate_stats(self.workers.iter().map(|w| w.stats()));

        WalkProgress {
            dirs,
            files,
            errors,
            batches,
            pending: self.queue.pending(),
            queued: self.queue.stats().enqueued_count(),
            backpressure_events: self.queue.stats().backpressure_count(),
            active_workers: self.queue.active_workers(),
            total_workers: self.workers.len(),
            elapsed: self.started.elapsed(),
        }
    }

    /// Push discipline on the calling thread: `Some(batch)` per batch, then
    /// exactly one `None`
    pub fn for_each_batch<F>(mut self, mut callback: F) -> Result<WalkStats>
    where
        F: FnMut(Option<Batch>),
    {
        while let Some(batch) = self.next_batch() {
            callback(Some(batch));
        }
        callback(None);
        self.finish()
    }

    /// Stop the walk (if still running) and wait for the workers
    pub fn finish(mut self) -> Result<WalkStats> {
        if !self.exhausted {
            self.cancel.cancel();
        }
        // Unblocks any worker still waiting to deliver
        self.receiver = None;

        let mut first_err = None;
        for worker in &mut self.workers {
            if let Err(e) = worker.join() {
                warn!(worker = worker.id(), error = %e, "Worker failed");
                first_err.get_or_insert(e);
            }
        }
        if let Some(e) = first_err {
            return Err(e.into());
        }

        let (dirs, files, errors, batches) =
            aggregate_stats(self.workers.iter().map(|w| w.stats()));

        let stats = WalkStats {
            dirs,
            files,
            errors,
            batches,
            dirs_queued: self.queue.stats().enqueued_count(),
            backpressure_events: self.queue.stats().backpressure_count(),
            duration: self.started.elapsed(),
            completed: self.exhausted,
        };

        info!(
            dirs = stats.dirs,
            files = stats.files,
            errors = stats.errors,
            batches = stats.batches,
            dirs_queued = stats.dirs_queued,
            backpressure = stats.backpressure_events,
            completed = stats.completed,
            "Walk finished"
        );

        Ok(stats)
    }
}

impl Iterator for WalkStream {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        self.next_batch()
    }
}

impl Drop for WalkStream {
    fn drop(&mut self) {
        if !self.exhausted {
            self.cancel.cancel();
        }
        if self.receiver.take().is_some() && !self.workers.is_empty() {
            debug!("Walk stream dropped before exhaustion");
        }
    }
}

/// Push-style handle: a delivery thread feeds a callback
pub struct PushHandle {
    cancel: CancelToken,
    handle: Option<JoinHandle<Result<WalkStats>>>,
}

impl PushHandle {
    /// Start delivering `stream` to `callback` on a dedicated thread
    pub fn spawn<F>(stream: WalkStream, callback: F) -> Result<Self>
    where
        F: FnMut(Option<Batch>) + Send + 'static,
    {
        let cancel = stream.cancel_token();
        let handle = thread::Builder::new()
            .name("walk-delivery".into())
            .spawn(move || stream.for_each_batch(callback))
            .map_err(|e| WorkerError::SpawnFailed {
                id: usize::MAX,
                reason: e.to_string(),
            })?;

        Ok(Self {
            cancel,
            handle: Some(handle),
        })
    }

    /// Abandon the walk; the callback still receives its final `None`
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the final callback and return the walk statistics
    pub fn join(mut self) -> Result<WalkStats> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| WorkerError::DeliveryPanicked)?,
            None => Err(WorkerError::DeliveryPanicked.into()),
        }
    }
}
