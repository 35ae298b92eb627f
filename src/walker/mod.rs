//! Parallel filesystem walker
//!
//! # Architecture
//!
//! ```text
//!                     ┌─────────────────────────┐
//!                     │    WalkCoordinator      │
//!                     │  - seeds one task/root  │
//!                     │  - spawns the pool      │
//!                     └───────────┬─────────────┘
//!                                 │ WorkQueue (bounded, in-flight counter)
//!       ┌─────────────────────────┼─────────────────────────┐
//!       │                         │                         │
//! ┌─────▼─────┐             ┌─────▼─────┐             ┌─────▼─────┐
//! │  Worker 1 │             │  Worker 2 │             │  Worker N │
//! │  readdir  │             │  readdir  │             │  readdir  │
//! │  filters  │             │  filters  │             │  filters  │
//! │  batches  │             │  batches  │             │  batches  │
//! └─────┬─────┘             └─────┬─────┘             └─────┬─────┘
//!       └─────────────────────────┼─────────────────────────┘
//!                                 │ delivery channel (bounded, batches)
//!                     ┌───────────▼─────────────┐
//!                     │ WalkStream / PushHandle │
//!                     └─────────────────────────┘
//! ```

pub mod batch;
pub mod cancel;
pub mod coordinator;
pub mod queue;
pub mod stream;
pub mod worker;

pub use cancel::CancelToken;
pub use coordinator::WalkCoordinator;
pub use stream::{PushHandle, WalkProgress, WalkStats, WalkStream};
