//! Error types for walkrs
//!
//! This module defines the error hierarchy:
//! - Request errors (invalid configuration), raised before any traversal
//! - Traversal errors, scoped to a single path and delivered as stream items
//! - Worker thread errors
//!
//! Request errors abort the call. Traversal errors never do: they are turned
//! into [`WalkItem::Error`](crate::types::WalkItem) and flow through the same
//! channel as the entries.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for walkrs
#[derive(Error, Debug)]
pub enum WalkerError {
    /// Invalid walk request
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Batch encoding errors
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// I/O errors outside of traversal (request files, stdout)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Request errors, surfaced synchronously before traversal starts
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Exclusion glob failed to compile
    #[error("Invalid exclusion pattern '{pattern}': {reason}")]
    InvalidExcludePattern { pattern: String, reason: String },

    /// Invalid worker count
    #[error("Invalid thread count {count}: must be between 0 and {max}")]
    InvalidThreadCount { count: usize, max: usize },

    /// Invalid batch size
    #[error("Invalid batch size {size}: must be between {min} and {max}")]
    InvalidBatchSize { size: usize, min: usize, max: usize },

    /// Delivery channel must hold at least one batch
    #[error("Invalid channel capacity {capacity}: must be at least 1")]
    InvalidChannelCapacity { capacity: usize },

    /// Request file could not be read or parsed
    #[error("Invalid request '{path}': {reason}")]
    InvalidRequest { path: PathBuf, reason: String },

    /// Root path could not be made absolute
    #[error("Invalid root path '{path}': {reason}")]
    InvalidRoot { path: String, reason: String },
}

/// Path-scoped failures captured during traversal
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraversalError {
    /// Permission denied
    #[error("Permission denied: '{path}'")]
    PermissionDenied { path: String },

    /// Path not found (missing root, or vanished mid-walk)
    #[error("Path not found: '{path}'")]
    NotFound { path: String },

    /// Directory listing failed
    #[error("Failed to read directory '{path}': {reason}")]
    ReadDirFailed { path: String, reason: String },

    /// Metadata lookup failed
    #[error("Failed to stat '{path}': {reason}")]
    StatFailed { path: String, reason: String },

    /// Path cannot be represented as UTF-8
    #[error("Path is not valid UTF-8: '{path}'")]
    InvalidUtf8 { path: String },
}

impl TraversalError {
    /// Classify an I/O error raised while listing `path`
    pub fn read_dir(path: impl Into<String>, err: &io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::PermissionDenied => TraversalError::PermissionDenied { path },
            io::ErrorKind::NotFound => TraversalError::NotFound { path },
            _ => TraversalError::ReadDirFailed {
                path,
                reason: err.to_string(),
            },
        }
    }

    /// Classify an I/O error raised while stat'ing `path`
    pub fn stat(path: impl Into<String>, err: &io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::PermissionDenied => TraversalError::PermissionDenied { path },
            io::ErrorKind::NotFound => TraversalError::NotFound { path },
            _ => TraversalError::StatFailed {
                path,
                reason: err.to_string(),
            },
        }
    }

    /// Returns the path this error is scoped to
    pub fn path(&self) -> &str {
        match self {
            TraversalError::PermissionDenied { path }
            | TraversalError::NotFound { path }
            | TraversalError::ReadDirFailed { path, .. }
            | TraversalError::StatFailed { path, .. }
            | TraversalError::InvalidUtf8 { path } => path,
        }
    }

    /// Races with a changing filesystem, not worth a warning
    pub fn is_vanished(&self) -> bool {
        matches!(self, TraversalError::NotFound { .. })
    }
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Thread could not be spawned
    #[error("Failed to spawn worker {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },

    /// Worker panicked
    #[error("Worker {id} panicked")]
    Panicked { id: usize },

    /// Push-mode delivery thread panicked (usually inside the callback)
    #[error("Delivery thread panicked")]
    DeliveryPanicked,
}

/// Result type alias for WalkerError
pub type Result<T> = std::result::Result<T, WalkerError>;

/// Represents the outcome of expanding a single work item
#[derive(Debug)]
pub enum WalkOutcome {
    /// Directory listed
    Expanded {
        path: String,
        files: usize,
        subdirs: usize,
    },

    /// Not expanded: excluded, a leaf root, or cancelled
    Skipped { path: String, reason: &'static str },

    /// Listing failed; reported as an error item
    Failed { path: String, error: TraversalError },
}
