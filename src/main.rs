//! walkrs - Parallel Filesystem Walker
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use walkrs::config::{CliArgs, WalkConfig};
use walkrs::progress::{format_number, print_header, print_summary, ProgressReporter};
use walkrs::walker::{WalkCoordinator, WalkStats};
use walkrs::{Batch, BatchEncoder, CancelToken, PushHandle, WalkStream};

/// Minimum time between spinner refreshes
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    // Validate and create config; an invalid request fails before any walking
    let request = args.to_request().context("Invalid request")?;
    let config = WalkConfig::from_request(request).context("Invalid configuration")?;

    if !args.quiet {
        print_header(&config.roots, config.worker_count);
    }

    let encoder = Arc::new(BatchEncoder::new(config.lightweight));
    if encoder.is_lightweight() && args.json {
        info!("Lightweight mode: batches are not encoded, --json prints nothing");
    }

    let coordinator = WalkCoordinator::new(config);

    // Setup signal handler for graceful shutdown
    let cancel = coordinator.cancel_token();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        cancel.cancel();
    })
    .context("Failed to set signal handler")?;

    let progress = if args.quiet {
        ProgressReporter::hidden()
    } else {
        ProgressReporter::new()
    };
    progress.set_status("Walking...");

    let stream = coordinator.start().context("Failed to start walk")?;

    let stats = if args.push {
        run_push(stream, Arc::clone(&encoder), args.json, &progress)?
    } else {
        run_pull(stream, &encoder, args.json, &progress)?
    };

    progress.finish_and_clear();

    if args.json {
        info!(
            batches = encoder.batches_encoded(),
            bytes = encoder.bytes_encoded(),
            "Output written"
        );
    }

    if !args.quiet {
        print_summary(&stats);
    }

    if !stats.completed {
        info!("Walk was interrupted before completion");
    }

    if stats.errors > 0 {
        info!(errors = stats.errors, "Walk completed with errors");
    }

    Ok(())
}

/// Pull batches on the main thread
fn run_pull(
    mut stream: WalkStream,
    encoder: &BatchEncoder,
    json: bool,
    progress: &ProgressReporter,
) -> Result<WalkStats> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut last_update = Instant::now();

    while let Some(batch) = stream.next_batch() {
        emit(encoder, json, &mut out, &batch)?;

        if last_update.elapsed() >= PROGRESS_INTERVAL {
            progress.update(&stream.progress());
            last_update = Instant::now();
        }
    }

    out.flush().context("Failed to flush output")?;
    stream.finish().context("Walk failed")
}

/// Hand batches to a callback on the delivery thread
fn run_push(
    stream: WalkStream,
    encoder: Arc<BatchEncoder>,
    json: bool,
    progress: &ProgressReporter,
) -> Result<WalkStats> {
    let mut sink = PushSink::new(
        encoder,
        json,
        BufWriter::new(io::stdout()),
        stream.cancel_token(),
        progress.clone(),
    );
    let files = Arc::clone(&sink.files);
    let batches = Arc::clone(&sink.batches);
    let failure = Arc::clone(&sink.failure);

    let handle = PushHandle::spawn(stream, move |batch| sink.deliver(batch))
        .context("Failed to start delivery thread")?;
    let stats = handle.join().context("Walk failed")?;

    // Same outcome as pull mode: the first write failure ends the run
    if let Some(e) = failure.lock().ok().and_then(|mut slot| slot.take()) {
        return Err(e);
    }

    info!(
        files = files.load(Ordering::Relaxed),
        batches = batches.load(Ordering::Relaxed),
        "Callback delivery finished"
    );
    Ok(stats)
}

/// Callback state for push mode.
///
/// The first write failure is recorded and cancels the walk; later batches
/// are dropped without writing.
struct PushSink<W: Write> {
    encoder: Arc<BatchEncoder>,
    json: bool,
    out: W,
    cancel: CancelToken,
    reporter: ProgressReporter,
    files: Arc<AtomicU64>,
    batches: Arc<AtomicU64>,
    failure: Arc<Mutex<Option<anyhow::Error>>>,
    failed: bool,
}

impl<W: Write> PushSink<W> {
    fn new(
        encoder: Arc<BatchEncoder>,
        json: bool,
        out: W,
        cancel: CancelToken,
        reporter: ProgressReporter,
    ) -> Self {
        Self {
            encoder,
            json,
            out,
            cancel,
            reporter,
            files: Arc::new(AtomicU64::new(0)),
            batches: Arc::new(AtomicU64::new(0)),
            failure: Arc::new(Mutex::new(None)),
            failed: false,
        }
    }

    fn deliver(&mut self, batch: Option<Batch>) {
        if self.failed {
            return;
        }

        let result = match batch {
            Some(batch) => self.write(&batch),
            None => self.out.flush().context("Failed to flush output"),
        };

        if let Err(e) = result {
            error!("{:#}, cancelling walk", e);
            self.failed = true;
            self.cancel.cancel();
            if let Ok(mut slot) = self.failure.lock() {
                slot.get_or_insert(e);
            }
        }
    }

    fn write(&mut self, batch: &Batch) -> Result<()> {
        let entries = batch.iter().filter(|item| item.is_entry()).count() as u64;
        let files = self.files.fetch_add(entries, Ordering::Relaxed) + entries;
        let batches = self.batches.fetch_add(1, Ordering::Relaxed) + 1;

        emit(&self.encoder, self.json, &mut self.out, batch)?;

        self.reporter.set_status(&format!(
            "Files: {} | Batches: {}",
            format_number(files),
            format_number(batches)
        ));
        Ok(())
    }
}

/// Write one batch as a JSON line when `--json` is set
fn emit<W: Write>(encoder: &BatchEncoder, json: bool, out: &mut W, batch: &Batch) -> Result<()> {
    if json {
        encoder
            .write_line(out, batch)
            .context("Failed to write batch")?;
    }
    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("walkrs=debug,warn")
    } else {
        EnvFilter::new("walkrs=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
