//! Progress reporting for the filesystem walker
//!
//! Provides real-time progress display using indicatif progress bars.

use crate::walker::{WalkProgress, WalkStats};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

/// Progress reporter that displays walk status
#[derive(Clone)]
pub struct ProgressReporter {
    /// Progress bar
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        if let Ok(spinner) =
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            bar.set_style(spinner.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Reporter that draws nothing (quiet mode)
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Update the progress display
    pub fn update(&self, progress: &WalkProgress) {
        let msg = format!(
            "Dirs: {} | Files: {} | Errors: {} | Rate: {:.0}/s | Pending: {} | Queued: {} | Overflow: {} | Workers: {}/{}",
            format_number(progress.dirs),
            format_number(progress.files),
            format_number(progress.errors),
            progress.files_per_second(),
            progress.pending,
            format_number(progress.queued),
            format_number(progress.backpressure_events),
            progress.active_workers,
            progress.total_workers,
        );

        self.bar.set_message(msg);
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .rev()
                .map(|&b| b as char)
                .collect::<String>()
        })
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a summary of the walk results (stderr, so stdout stays data-only)
pub fn print_summary(stats: &WalkStats) {
    let title = if stats.completed {
        style("Walk Complete").green().bold()
    } else {
        style("Walk Cancelled").yellow().bold()
    };

    eprintln!();
    eprintln!("{}", title);
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!(
        "  {} {}",
        style("Directories:").bold(),
        format_number(stats.dirs)
    );
    eprintln!("  {} {}", style("Files:").bold(), format_number(stats.files));
    eprintln!(
        "  {} {}",
        style("Batches:").bold(),
        format_number(stats.batches)
    );
    eprintln!(
        "  {} {} queued, {} kept local",
        style("Work queue:").bold(),
        format_number(stats.dirs_queued),
        format_number(stats.backpressure_events)
    );
    eprintln!(
        "  {} {:.1}s ({:.0} files/sec)",
        style("Duration:").bold(),
        stats.duration.as_secs_f64(),
        stats.files_per_second()
    );
    if stats.errors > 0 {
        eprintln!(
            "  {} {}",
            style("Errors:").yellow().bold(),
            format_number(stats.errors)
        );
    }
    eprintln!();
}

/// Print a header at the start of the walk
pub fn print_header(roots: &[PathBuf], workers: usize) {
    eprintln!();
    eprintln!(
        "{} {}",
        style("walkrs").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("{}", style("─".repeat(50)).dim());
    for root in roots {
        eprintln!("  {} {}", style("Root:").bold(), root.display());
    }
    eprintln!("  {} {}", style("Workers:").bold(), workers);
    eprintln!();
}
