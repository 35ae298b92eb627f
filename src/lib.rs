//! walkrs - Parallel Filesystem Walker
//!
//! Walks one or more directory trees in parallel and streams every file that
//! passes the configured filters back to the caller in bounded batches.
//!
//! # Features
//!
//! - **Parallel Traversal**: A fixed pool of worker threads expands
//!   directories from a shared bounded work queue.
//!
//! - **Filtering**: Case-insensitive glob exclusions (matched against the
//!   absolute path, pruning whole subtrees) and an extension allow-list.
//!
//! - **Backpressure**: Batches flow through a bounded channel; workers stall
//!   when the consumer falls behind instead of buffering without limit.
//!
//! - **Pull or Push**: Iterate a [`WalkStream`] or hand a callback to
//!   [`walk_with_callback`].
//!
//! - **Errors as Data**: An unreadable directory becomes one error item in
//!   the stream; its siblings are still walked.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         WalkRequest                              │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ WalkConfig::from_request
//!                               │ (normalize roots, compile filters)
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Worker Threads                              │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐         ┌─────────┐     │
//! │  │Worker 1 │  │Worker 2 │  │Worker 3 │  ...    │Worker N │     │
//! │  │ batcher │  │ batcher │  │ batcher │         │ batcher │     │
//! │  └────┬────┘  └────┬────┘  └────┬────┘         └────┬────┘     │
//! │       │            │            │                    │          │
//! │       └────────────┼────────────┼────────────────────┘          │
//! │                    ▼            ▼                               │
//! │            ┌──────────────────────────┐                         │
//! │            │     Work Queue           │                         │
//! │            │  (crossbeam bounded)     │                         │
//! │            │  - in-flight counter     │                         │
//! │            └──────────────────────────┘                         │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ Batch channel (bounded)
//!                               ▼
//!                    ┌──────────────────────┐
//!                    │ WalkStream (pull)    │
//!                    │ PushHandle (push)    │
//!                    └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use walkrs::{walk, WalkItem, WalkRequest};
//!
//! let request = WalkRequest::new(["/photos"])
//!     .exclude(["**/*.tmp", "**/raw/**"])
//!     .extensions([".jpg", ".png"]);
//!
//! for batch in walk(request)? {
//!     for item in batch {
//!         match item {
//!             WalkItem::Entry(entry) => println!("{}", entry.path),
//!             WalkItem::Error(err) => eprintln!("{}", err.message),
//!         }
//!     }
//! }
//! # Ok::<(), walkrs::WalkerError>(())
//! ```

pub mod config;
pub mod encode;
pub mod error;
pub mod filter;
pub mod path;
pub mod progress;
pub mod types;
pub mod walker;

pub use config::{CliArgs, WalkConfig, WalkRequest};
pub use encode::{decode_batch, BatchEncoder};
pub use error::{ConfigError, Result, TraversalError, WalkerError};
pub use types::{Batch, ErrorItem, FileEntry, WalkItem};
pub use walker::{CancelToken, PushHandle, WalkCoordinator, WalkProgress, WalkStats, WalkStream};

use tracing::debug;

/// Start a walk with the pull discipline.
///
/// The request is validated before any thread starts; an invalid request
/// (for example a glob that does not compile) fails here and produces no
/// batches.
pub fn walk(request: WalkRequest) -> Result<WalkStream> {
    let config = WalkConfig::from_request(request)?;
    debug!(
        roots = config.roots.len(),
        workers = config.worker_count,
        "Walk request resolved"
    );
    WalkCoordinator::new(config).start()
}

/// Start a walk with the push discipline.
///
/// `callback` runs on a dedicated delivery thread and receives `Some(batch)`
/// for each batch, then exactly one `None`. At most `channelCapacity`
/// batches wait for it, so a slow callback stalls the walk.
pub fn walk_with_callback<F>(request: WalkRequest, callback: F) -> Result<PushHandle>
where
    F: FnMut(Option<Batch>) + Send + 'static,
{
    let stream = walk(request)?;
    PushHandle::spawn(stream, callback)
}
