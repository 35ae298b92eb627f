//! Delivery encoding
//!
//! Batches cross process boundaries as JSON arrays of tagged items:
//!
//! ```json
//! [{"type":"entry","path":"/photos/a.jpg","modifiedAt":1700000000},
//!  {"type":"error","path":"/photos/restricted","message":"Permission denied: '/photos/restricted'"}]
//! ```
//!
//! In lightweight mode the encoder is a no-op so raw traversal throughput
//! can be measured without serialization cost.

use crate::error::Result;
use crate::types::{Batch, WalkItem};
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Encodes batches for delivery
#[derive(Debug, Default)]
pub struct BatchEncoder {
    lightweight: bool,

    /// Batches encoded so far
    batches: AtomicU64,

    /// Bytes produced so far
    bytes: AtomicU64,
}

impl BatchEncoder {
    /// Create an encoder; `lightweight` skips encoding entirely
    pub fn new(lightweight: bool) -> Self {
        Self {
            lightweight,
            ..Default::default()
        }
    }

    /// Check whether encoding is skipped
    pub fn is_lightweight(&self) -> bool {
        self.lightweight
    }

    /// Encode one batch as a JSON array, or `None` in lightweight mode
    pub fn encode(&self, batch: &Batch) -> Result<Option<Vec<u8>>> {
        if self.lightweight {
            return Ok(None);
        }
        let bytes = serde_json::to_vec(batch)?;
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes.len() as u64, Ordering::Relaxed);
        Ok(Some(bytes))
    }

    /// Encode one batch as a single JSON line. Returns bytes written.
    pub fn write_line<W: Write>(&self, out: &mut W, batch: &Batch) -> Result<usize> {
        match self.encode(batch)? {
            Some(bytes) => {
                out.write_all(&bytes)?;
                out.write_all(b"\n")?;
                Ok(bytes.len() + 1)
            }
            None => Ok(0),
        }
    }

    /// Batches encoded so far
    pub fn batches_encoded(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    /// Bytes produced so far
    pub fn bytes_encoded(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// Decode a batch produced by [`BatchEncoder::encode`]
pub fn decode_batch(bytes: &[u8]) -> Result<Vec<WalkItem>> {
    Ok(serde_json::from_slice(bytes)?)
}
