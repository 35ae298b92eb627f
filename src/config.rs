//! Configuration types for walkrs
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - The serializable [`WalkRequest`] accepted by the library
//! - The validated runtime [`WalkConfig`], resolved once per walk

use crate::error::ConfigError;
use crate::filter::FilterSet;
use crate::path::{drop_covered_roots, normalize_roots};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Maximum reasonable worker count
pub const MAX_WORKERS: usize = 512;

/// Batch size limits
pub const MIN_BATCH_SIZE: usize = 1;
pub const MAX_BATCH_SIZE: usize = 1_000_000;

/// Items per delivered batch
pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// Batches buffered before producers stall
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Directories buffered in the shared work queue
pub const DEFAULT_QUEUE_SIZE: usize = 10_000;

/// Walk a set of directory trees and stream the files found in batches
#[derive(Parser, Debug, Clone)]
#[command(
    name = "walkrs",
    version,
    about = "Parallel filesystem walker that streams files in bounded batches",
    long_about = "Enumerates every file below the given roots using a pool of worker threads.\n\n\
                  Results are delivered in batches; unreadable directories are reported as\n\
                  error items and never abort the walk.",
    after_help = "EXAMPLES:\n    \
        walkrs /photos /videos --ext .jpg --ext .mp4\n    \
        walkrs /library --exclude '**/@eaDir/**' --exclude '**/*.tmp' -t 8\n    \
        walkrs /library --metadata --json > files.jsonl\n    \
        walkrs --request walk.json --lightweight"
)]
pub struct CliArgs {
    /// Root paths to walk
    #[arg(value_name = "PATHS")]
    pub paths: Vec<String>,

    /// JSON file holding a walk request (CLI paths are appended)
    #[arg(long, value_name = "FILE")]
    pub request: Option<PathBuf>,

    /// Exclude paths matching glob (can be repeated)
    #[arg(long = "exclude", value_name = "PATTERN", action = clap::ArgAction::Append)]
    pub exclusion_patterns: Vec<String>,

    /// Only report files with this extension, e.g. ".jpg" (can be repeated)
    #[arg(long = "ext", value_name = "EXT", action = clap::ArgAction::Append)]
    pub extensions: Vec<String>,

    /// Worker threads (0 = one per CPU)
    #[arg(short = 't', long, default_value = "0", value_name = "NUM")]
    pub threads: usize,

    /// Attach modification and creation times to entries
    #[arg(short = 'm', long)]
    pub metadata: bool,

    /// Skip batch encoding entirely (raw throughput measurement)
    #[arg(long)]
    pub lightweight: bool,

    /// Skip entries whose name starts with '.'
    #[arg(long)]
    pub skip_hidden: bool,

    /// Items per batch
    #[arg(short = 'b', long, default_value_t = DEFAULT_BATCH_SIZE, value_name = "NUM")]
    pub batch_size: usize,

    /// Batches buffered before workers stall
    #[arg(long, default_value_t = DEFAULT_CHANNEL_CAPACITY, value_name = "NUM")]
    pub channel_capacity: usize,

    /// Deliver batches through a callback instead of pulling them
    #[arg(long)]
    pub push: bool,

    /// Print each encoded batch as one JSON line on stdout
    #[arg(long)]
    pub json: bool,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (show errors and warnings)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Build the walk request described by these arguments
    pub fn to_request(&self) -> Result<WalkRequest, ConfigError> {
        let mut request = match &self.request {
            Some(path) => WalkRequest::from_json_file(path)?,
            None => WalkRequest::default(),
        };

        request.paths.extend(self.paths.iter().cloned());
        request
            .exclusion_patterns
            .extend(self.exclusion_patterns.iter().cloned());
        request.extensions.extend(self.extensions.iter().cloned());

        if self.request.is_none() || self.threads != 0 {
            request.threads = self.threads;
        }
        if self.request.is_none() || self.batch_size != DEFAULT_BATCH_SIZE {
            request.batch_size = self.batch_size;
        }
        if self.request.is_none() || self.channel_capacity != DEFAULT_CHANNEL_CAPACITY {
            request.channel_capacity = self.channel_capacity;
        }
        request.include_metadata |= self.metadata;
        request.lightweight_mode |= self.lightweight;
        request.skip_hidden |= self.skip_hidden;

        Ok(request)
    }
}

/// A walk request as seen by callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WalkRequest {
    /// Root paths; empty yields an empty stream
    pub paths: Vec<String>,

    /// Exclusion globs
    pub exclusion_patterns: Vec<String>,

    /// Extension allow-list, e.g. ".jpg"
    pub extensions: Vec<String>,

    /// 0 = automatic, 1 = sequential, N = fixed pool
    pub threads: usize,

    /// Attach timestamps to entries
    pub include_metadata: bool,

    /// Skip the encoding step (throughput measurement only)
    pub lightweight_mode: bool,

    /// Skip dot-entries below the roots
    pub skip_hidden: bool,

    /// Items per batch
    pub batch_size: usize,

    /// Batches buffered before producers stall
    pub channel_capacity: usize,

    /// Shared work queue capacity
    pub queue_size: usize,
}

impl Default for WalkRequest {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            exclusion_patterns: Vec::new(),
            extensions: Vec::new(),
            threads: 0,
            include_metadata: false,
            lightweight_mode: false,
            skip_hidden: false,
            batch_size: DEFAULT_BATCH_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            queue_size: DEFAULT_QUEUE_SIZE,
        }
    }
}

impl WalkRequest {
    /// Request walking `paths` with default options
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Add exclusion globs
    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusion_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Restrict files to these extensions
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions.extend(extensions.into_iter().map(Into::into));
        self
    }

    /// Set the worker count (0 = automatic)
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Attach timestamps to entries
    pub fn include_metadata(mut self, yes: bool) -> Self {
        self.include_metadata = yes;
        self
    }

    /// Skip dot-entries
    pub fn skip_hidden(mut self, yes: bool) -> Self {
        self.skip_hidden = yes;
        self
    }

    /// Set the batch size
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the delivery channel capacity
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Skip the delivery encoding step
    pub fn lightweight_mode(mut self, yes: bool) -> Self {
        self.lightweight_mode = yes;
        self
    }

    /// Set the shared work queue capacity
    pub fn queue_size(mut self, size: usize) -> Self {
        self.queue_size = size;
        self
    }

    /// Load a request from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidRequest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| ConfigError::InvalidRequest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct WalkConfig {
    /// Normalized, deduplicated roots
    pub roots: Vec<PathBuf>,

    /// Compiled filters
    pub filters: FilterSet,

    /// Resolved number of worker threads (never 0)
    pub worker_count: usize,

    /// Attach timestamps to entries
    pub include_metadata: bool,

    /// Skip the encoding step
    pub lightweight: bool,

    /// Items per batch
    pub batch_size: usize,

    /// Batches buffered before producers stall
    pub channel_capacity: usize,

    /// Shared work queue capacity
    pub queue_size: usize,
}

impl WalkConfig {
    /// Validate `request` and resolve every default
    pub fn from_request(request: WalkRequest) -> Result<Self, ConfigError> {
        let worker_count = resolve_thread_count(request.threads)?;

        if request.batch_size < MIN_BATCH_SIZE || request.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::InvalidBatchSize {
                size: request.batch_size,
                min: MIN_BATCH_SIZE,
                max: MAX_BATCH_SIZE,
            });
        }

        if request.channel_capacity == 0 {
            return Err(ConfigError::InvalidChannelCapacity {
                capacity: request.channel_capacity,
            });
        }

        let filters = FilterSet::compile(
            &request.exclusion_patterns,
            &request.extensions,
            request.skip_hidden,
        )?;

        let roots = drop_covered_roots(normalize_roots(&request.paths)?, &filters);

        // Seeds and shutdown messages must always fit
        let queue_size = request.queue_size.max(roots.len() + worker_count).max(1);

        Ok(Self {
            roots,
            filters,
            worker_count,
            include_metadata: request.include_metadata,
            lightweight: request.lightweight_mode,
            batch_size: request.batch_size,
            channel_capacity: request.channel_capacity,
            queue_size,
        })
    }
}

/// Turn the requested thread count into a concrete pool size
pub fn resolve_thread_count(threads: usize) -> Result<usize, ConfigError> {
    match threads {
        0 => Ok(num_cpus::get().clamp(1, MAX_WORKERS)),
        n if n > MAX_WORKERS => Err(ConfigError::InvalidThreadCount {
            count: n,
            max: MAX_WORKERS,
        }),
        n => Ok(n),
    }
}
