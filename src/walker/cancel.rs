//! Walk cancellation
//!
//! A [`CancelToken`] is shared by the consumer and every worker. Workers
//! check the flag between work items; workers blocked on a full delivery
//! channel also wait on [`CancelToken::signal`], which disconnects the
//! moment the walk is cancelled.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Shared cancellation flag plus a wake-up channel for blocked senders
#[derive(Clone, Debug)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    trigger: Arc<Mutex<Option<Sender<()>>>>,
    signal: Receiver<()>,
}

impl CancelToken {
    /// Create an untriggered token
    pub fn new() -> Self {
        let (trigger, signal) = bounded(0);
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            trigger: Arc::new(Mutex::new(Some(trigger))),
            signal,
        }
    }

    /// Cancel the walk. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        // Dropping the only sender disconnects every `signal()` receiver
        let mut trigger = self
            .trigger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        trigger.take();
    }

    /// Check if the walk was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Receiver that becomes ready (disconnected) once cancelled, for use in
    /// `crossbeam_channel::select!`
    pub fn signal(&self) -> &Receiver<()> {
        &self.signal
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
