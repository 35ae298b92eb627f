//! Batch assembly
//!
//! Each worker owns a [`BatchAssembler`]. Items are buffered until the batch
//! reaches its target size, then handed to the bounded delivery channel.
//! A full channel blocks the worker (backpressure) until the consumer pulls
//! or the walk is cancelled. Partial batches are flushed when the worker
//! goes idle and when the assembler is dropped; empty batches are never sent.

use crate::types::{Batch, WalkItem};
use crate::walker::cancel::CancelToken;
use crate::walker::worker::WorkerStats;
use crossbeam_channel::{select, Sender};
use std::sync::Arc;

/// The consumer is gone or the walk was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelClosed;

/// Per-worker accumulator feeding the delivery channel
pub struct BatchAssembler {
    batch: Batch,
    tx: Sender<Batch>,
    limit: usize,
    cancel: CancelToken,
    stats: Arc<WorkerStats>,
}

impl BatchAssembler {
    /// Create an assembler flushing every `limit` items
    pub fn new(tx: Sender<Batch>, limit: usize, cancel: CancelToken, stats: Arc<WorkerStats>) -> Self {
        let limit = limit.max(1);
        Self {
            batch: Vec::with_capacity(limit),
            tx,
            limit,
            cancel,
            stats,
        }
    }

    /// Add one item, flushing if the batch is full
    pub fn push(&mut self, item: impl Into<WalkItem>) -> Result<(), ChannelClosed> {
        let item = item.into();
        self.stats.record_item(&item);
        self.batch.push(item);
        if self.batch.len() >= self.limit {
            self.flush()?;
        }
        Ok(())
    }

    /// Deliver the current batch, if any
    pub fn flush(&mut self) -> Result<(), ChannelClosed> {
        if self.batch.is_empty() {
            return Ok(());
        }
        if self.cancel.is_cancelled() {
            self.batch.clear();
            return Err(ChannelClosed);
        }

        let batch = std::mem::replace(&mut self.batch, Vec::with_capacity(self.limit));
        select! {
            send(self.tx, batch) -> res => {
                res.map_err(|_| ChannelClosed)?;
                self.stats.record_batch();
                Ok(())
            }
            recv(self.cancel.signal()) -> _ => Err(ChannelClosed),
        }
    }
}

impl Drop for BatchAssembler {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
