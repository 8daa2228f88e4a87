//! Progress reporter implementation
//!
//! Uses indicatif for a live status line in interactive commands, and
//! tracing for the periodic progress lines of a transfer run.

use crate::config::OutputFormat;
use crate::error::Result;
use crate::sync::LedgerSnapshot;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live status line with running counters
pub struct ProgressReporter {
    /// Spinner carrying the status message
    status: ProgressBar,
    /// Start time
    start_time: Instant,
    /// Files processed so far
    files: AtomicU64,
    /// Bytes processed so far
    bytes: AtomicU64,
}

impl ProgressReporter {
    /// Create a reporter drawing to stderr
    pub fn new() -> Self {
        let status = ProgressBar::new_spinner();
        status.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        status.enable_steady_tick(Duration::from_millis(120));
        Self::with_bar(status)
    }

    /// Create a reporter that draws nothing (quiet mode, tests)
    pub fn disabled() -> Self {
        let status = ProgressBar::new_spinner();
        status.set_draw_target(ProgressDrawTarget::hidden());
        Self::with_bar(status)
    }

    fn with_bar(status: ProgressBar) -> Self {
        Self {
            status,
            start_time: Instant::now(),
            files: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    /// Set current status message
    pub fn set_status(&self, msg: impl Into<String>) {
        self.status.set_message(msg.into());
    }

    /// Count one processed file
    pub fn record_file(&self, bytes: u64) -> (u64, u64) {
        let files = self.files.fetch_add(1, Ordering::Relaxed) + 1;
        let bytes = self.bytes.fetch_add(bytes, Ordering::Relaxed) + bytes;
        (files, bytes)
    }

    /// Files recorded so far
    pub fn files(&self) -> u64 {
        self.files.load(Ordering::Relaxed)
    }

    /// Bytes recorded so far
    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Get elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Clear the status line
    pub fn finish(&self) {
        self.status.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorten a path for a single status line
pub fn truncate_path(path: &str, max: usize) -> String {
    let chars = path.chars().count();
    if chars <= max || max <= 3 {
        return path.to_string();
    }
    let tail: String = path.chars().skip(chars - (max - 3)).collect();
    format!("...{}", tail)
}

/// Emit a progress line every `batch` completed files
pub fn log_batch_progress(snapshot: &LedgerSnapshot, batch: u64) -> bool {
    if batch == 0 || snapshot.files_completed == 0 || snapshot.files_completed % batch != 0 {
        return false;
    }
    tracing::info!(
        "Checkpoint: {} files sent ({})",
        snapshot.files_completed,
        humansize::format_size(snapshot.bytes_completed, humansize::BINARY)
    );
    true
}

/// Outcome of a client run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Files sent and checkpointed
    pub files_sent: u64,
    /// Bytes in sent files
    pub bytes_sent: u64,
    /// Files that failed
    pub files_failed: u64,
    /// Files skipped because of the checkpoint
    pub files_skipped: u64,
    /// Walk errors
    pub walk_errors: u64,
    /// Probe round trip
    pub probe_rtt: Duration,
    /// Total duration
    pub duration: Duration,
    /// Average throughput in bytes/second
    pub throughput: f64,
}

impl RunSummary {
    /// Check if every enumerated file made it
    pub fn is_success(&self) -> bool {
        self.files_failed == 0 && self.walk_errors == 0
    }

    /// Print summary to stdout in the requested format
    pub fn print(&self, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Text => {
                self.print_text();
                Ok(())
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(self)?);
                Ok(())
            }
        }
    }

    fn print_text(&self) {
        println!("\n=== Transfer Summary ===");
        println!("Files sent:      {}", self.files_sent);
        println!("Bytes sent:      {}", humansize::format_size(self.bytes_sent, humansize::BINARY));
        println!("Skipped:         {}", self.files_skipped);
        println!("Failed:          {}", self.files_failed);
        if self.walk_errors > 0 {
            println!("Walk errors:     {}", self.walk_errors);
        }
        println!("Probe RTT:       {:.2?}", self.probe_rtt);
        println!("Duration:        {:.2?}", self.duration);
        println!(
            "Throughput:      {}/s",
            humansize::format_size(self.throughput as u64, humansize::BINARY)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_reporter_counts() {
        let reporter = ProgressReporter::disabled();
        reporter.record_file(500);
        let (files, bytes) = reporter.record_file(250);

        assert_eq!((files, bytes), (2, 750));
        assert_eq!(reporter.files(), 2);
        assert_eq!(reporter.bytes(), 750);
        reporter.finish();
    }

    #[test]
    fn test_truncate_path() {
        assert_eq!(truncate_path("short.txt", 60), "short.txt");
        let long = "a/".repeat(50) + "file.txt";
        let shown = truncate_path(&long, 20);
        assert_eq!(shown.chars().count(), 20);
        assert!(shown.starts_with("..."));
        assert!(shown.ends_with("file.txt"));
    }

    #[test]
    fn test_batch_progress() {
        let mut snapshot = LedgerSnapshot::default();
        assert!(!log_batch_progress(&snapshot, 3000));

        snapshot.files_completed = 2999;
        assert!(!log_batch_progress(&snapshot, 3000));

        snapshot.files_completed = 3000;
        assert!(log_batch_progress(&snapshot, 3000));
    }

    #[test]
    fn test_summary_json() {
        let summary = RunSummary {
            files_sent: 2,
            bytes_sent: 15,
            files_failed: 0,
            files_skipped: 0,
            walk_errors: 0,
            probe_rtt: Duration::from_millis(1),
            duration: Duration::from_millis(10),
            throughput: 1500.0,
        };
        assert!(summary.is_success());

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["files_sent"], 2);
        assert_eq!(json["bytes_sent"], 15);
    }
}
