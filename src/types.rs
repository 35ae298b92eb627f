//! Walk result types
//!
//! A walk produces a stream of [`Batch`]es, each an ordered run of
//! [`WalkItem`]s. Every item is either a discovered file or a path-scoped
//! failure; the two travel through the same channel.

use crate::error::TraversalError;
use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::time::{SystemTime, UNIX_EPOCH};

/// A file that passed every filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Absolute, normalized path
    pub path: String,

    /// Modification time in epoch seconds (metadata requested and stat succeeded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<i64>,

    /// Creation time in epoch seconds, where the platform reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl FileEntry {
    /// Entry without timestamps
    pub fn new(path: String) -> Self {
        Self {
            path,
            modified_at: None,
            created_at: None,
        }
    }

    /// Entry with timestamps taken from `metadata`
    pub fn with_metadata(path: String, metadata: &Metadata) -> Self {
        Self {
            path,
            modified_at: metadata.modified().ok().map(epoch_secs),
            created_at: metadata.created().ok().map(epoch_secs),
        }
    }
}

/// A failure scoped to one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorItem {
    /// The entry or directory that failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Human-readable cause
    pub message: String,
}

impl From<TraversalError> for ErrorItem {
    fn from(err: TraversalError) -> Self {
        Self {
            path: Some(err.path().to_string()),
            message: err.to_string(),
        }
    }
}

/// One item of the walk stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WalkItem {
    /// Discovered file
    Entry(FileEntry),
    /// Path-scoped failure
    Error(ErrorItem),
}

impl WalkItem {
    /// Check if this is an entry
    pub fn is_entry(&self) -> bool {
        matches!(self, WalkItem::Entry(_))
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, WalkItem::Error(_))
    }

    /// The path carried by this item, if any
    pub fn path(&self) -> Option<&str> {
        match self {
            WalkItem::Entry(entry) => Some(&entry.path),
            WalkItem::Error(err) => err.path.as_deref(),
        }
    }
}

impl From<FileEntry> for WalkItem {
    fn from(entry: FileEntry) -> Self {
        WalkItem::Entry(entry)
    }
}

impl From<TraversalError> for WalkItem {
    fn from(err: TraversalError) -> Self {
        WalkItem::Error(err.into())
    }
}

/// A bounded group of items delivered together. Boundaries carry no meaning.
pub type Batch = Vec<WalkItem>;

/// Seconds since the Unix epoch; negative for pre-epoch timestamps
pub fn epoch_secs(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}
