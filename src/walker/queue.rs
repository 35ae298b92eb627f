//! Work queue with backpressure support
//!
//! This module provides a bounded work queue for directory tasks.
//! When the queue is full, backpressure is applied by keeping the
//! subdirectory on the discovering worker's local stack rather than
//! blocking.
//!
//! Termination is detected with an in-flight counter: it is incremented
//! before a task is queued (or kept locally) and decremented once the task
//! has been expanded. The worker that brings it to zero broadcasts one
//! shutdown message per worker, so idle workers block in `recv` instead of
//! polling.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// A task to expand one directory (or to classify one root)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirTask {
    /// Absolute path
    pub path: PathBuf,

    /// Depth from root (0 = root)
    pub depth: u32,
}

impl DirTask {
    /// Create a new directory task
    pub fn new(path: PathBuf, depth: u32) -> Self {
        Self { path, depth }
    }

    /// Create a root task
    pub fn root(path: PathBuf) -> Self {
        Self { path, depth: 0 }
    }

    /// Check if this task is a requested root
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }
}

/// Messages carried by the queue
#[derive(Debug)]
enum QueueMessage {
    Dir(DirTask),
    Shutdown,
}

/// Statistics for the work queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total tasks put on the shared queue
    pub enqueued: AtomicU64,

    /// Tasks kept on a worker's local stack because the queue was full
    pub backpressure_events: AtomicU64,
}

impl QueueStats {
    /// Get the number of tasks that went through the shared queue
    pub fn enqueued_count(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Get backpressure event count
    pub fn backpressure_count(&self) -> u64 {
        self.backpressure_events.load(Ordering::Relaxed)
    }
}

/// State shared by every handle of one queue
#[derive(Debug)]
struct Shared {
    /// Tasks created but not yet finished
    pending: AtomicUsize,

    /// Workers currently expanding a task
    active_workers: AtomicUsize,

    /// Set once the shutdown broadcast has gone out
    closed: AtomicBool,

    /// Number of workers to wake on shutdown
    worker_count: usize,

    stats: QueueStats,
}

/// Work queue with backpressure support
pub struct WorkQueue {
    /// Sender for adding tasks
    sender: Sender<QueueMessage>,

    /// Receiver for getting tasks
    receiver: Receiver<QueueMessage>,

    shared: Arc<Shared>,
}

impl WorkQueue {
    /// Create a queue with the given capacity serving `worker_count` workers
    pub fn new(capacity: usize, worker_count: usize) -> Self {
        let capacity = capacity.max(worker_count).max(1);
        let (sender, receiver) = bounded(capacity);

        Self {
            sender,
            receiver,
            shared: Arc::new(Shared {
                pending: AtomicUsize::new(0),
                active_workers: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
                worker_count,
                stats: QueueStats::default(),
            }),
        }
    }

    /// Get a sender for this queue (clone for each worker)
    pub fn sender(&self) -> WorkQueueSender {
        WorkQueueSender {
            sender: self.sender.clone(),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Get a receiver for this queue (clone for each worker)
    pub fn receiver(&self) -> WorkQueueReceiver {
        WorkQueueReceiver {
            receiver: self.receiver.clone(),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Get queue statistics
    pub fn stats(&self) -> &QueueStats {
        &self.shared.stats
    }

    /// Tasks created but not yet finished
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    /// Workers currently expanding a task
    pub fn active_workers(&self) -> usize {
        self.shared.active_workers.load(Ordering::Relaxed)
    }

    /// Seed the queue with one task per root.
    ///
    /// With no roots the queue is closed immediately.
    pub fn seed(&self, roots: &[PathBuf]) -> Result<(), TrySendError<DirTask>> {
        if roots.is_empty() {
            self.sender().close();
            return Ok(());
        }

        self.shared.pending.fetch_add(roots.len(), Ordering::SeqCst);
        for root in roots {
            let task = DirTask::root(root.clone());
            if let Err(e) = self.sender.try_send(QueueMessage::Dir(task.clone())) {
                return Err(match e {
                    TrySendError::Full(_) => TrySendError::Full(task),
                    TrySendError::Disconnected(_) => TrySendError::Disconnected(task),
                });
            }
            self.shared.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

/// Handle for sending tasks to the queue
#[derive(Clone)]
pub struct WorkQueueSender {
    sender: Sender<QueueMessage>,
    shared: Arc<Shared>,
}

impl WorkQueueSender {
    /// Register and try to queue a task
    ///
    /// Returns `Ok(None)` if queued
    /// Returns `Ok(Some(task))` if the queue is full (backpressure); the
    /// caller keeps the task and must still finish it
    /// Returns `Err` if the queue is disconnected
    pub fn push(&self, task: DirTask) -> Result<Option<DirTask>, ()> {
        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        match self.sender.try_send(QueueMessage::Dir(task)) {
            Ok(()) => {
                self.shared.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Err(TrySendError::Full(QueueMessage::Dir(task))) => {
                self.shared
                    .stats
                    .backpressure_events
                    .fetch_add(1, Ordering::Relaxed);
                Ok(Some(task))
            }
            Err(_) => {
                self.shared.pending.fetch_sub(1, Ordering::SeqCst);
                Err(())
            }
        }
    }

    /// Mark one task as finished. The last one closes the queue.
    pub fn finish(&self) {
        if self.shared.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.close();
        }
    }

    /// Broadcast shutdown to every worker (once)
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // Capacity >= worker_count and no task remains queued once pending hits zero
        for _ in 0..self.shared.worker_count {
            if self.sender.try_send(QueueMessage::Shutdown).is_err() {
                break;
            }
        }
    }
}

/// Handle for receiving tasks from the queue
#[derive(Clone)]
pub struct WorkQueueReceiver {
    receiver: Receiver<QueueMessage>,
    shared: Arc<Shared>,
}

/// Result of a non-blocking receive
#[derive(Debug, PartialEq, Eq)]
pub enum TryRecv {
    /// A task was available
    Task(DirTask),
    /// Nothing queued right now
    Empty,
    /// The queue has shut down
    Closed,
}

impl WorkQueueReceiver {
    /// Receive a task from the queue
    ///
    /// This blocks until a task is available, returning `None` once the
    /// queue has shut down.
    pub fn recv(&self) -> Option<DirTask> {
        match self.receiver.recv() {
            Ok(QueueMessage::Dir(task)) => Some(task),
            Ok(QueueMessage::Shutdown) | Err(_) => None,
        }
    }

    /// Try to receive a task without blocking
    pub fn try_recv(&self) -> TryRecv {
        match self.receiver.try_recv() {
            Ok(QueueMessage::Dir(task)) => TryRecv::Task(task),
            Ok(QueueMessage::Shutdown) | Err(TryRecvError::Disconnected) => TryRecv::Closed,
            Err(TryRecvError::Empty) => TryRecv::Empty,
        }
    }

    /// Mark this worker as active
    pub fn begin_work(&self) {
        self.shared.active_workers.fetch_add(1, Ordering::SeqCst);
    }

    /// Mark this worker as idle
    pub fn end_work(&self) {
        self.shared.active_workers.fetch_sub(1, Ordering::SeqCst);
    }
}

/// RAII guard for marking work as active
pub struct WorkGuard<'a> {
    receiver: &'a WorkQueueReceiver,
}

impl<'a> WorkGuard<'a> {
    /// Create a new work guard (marks worker as active)
    pub fn new(receiver: &'a WorkQueueReceiver) -> Self {
        receiver.begin_work();
        Self { receiver }
    }
}

impl<'a> Drop for WorkGuard<'a> {
    fn drop(&mut self) {
        self.receiver.end_work();
    }
}

/// RAII guard that finishes a task even if expansion unwinds
pub struct TaskGuard<'a> {
    sender: &'a WorkQueueSender,
}

impl<'a> TaskGuard<'a> {
    /// Track one task until the guard drops
    pub fn new(sender: &'a WorkQueueSender) -> Self {
        Self { sender }
    }
}

impl<'a> Drop for TaskGuard<'a> {
    fn drop(&mut self) {
        self.sender.finish();
    }
}
