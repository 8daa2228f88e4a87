//! Local parallel copier
//!
//! Copies every regular file of a source tree into a destination tree on
//! the same machine. The calling thread walks the source into a bounded
//! queue drained by the copy workers; a progress thread reports each
//! completion.

use crate::core::WorkerPool;
use crate::error::{IoResultExt, NetCopyError, Result};
use crate::fs::{copy_file, DirectoryWalker, TransferHooks, TransferJob};
use crate::network::resolve_wire_path;
use crate::progress::{truncate_path, ProgressReporter};
use crossbeam::channel::{bounded, unbounded, Sender};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Default number of copy workers
pub const DEFAULT_LOCAL_WORKERS: usize = 8;

/// Default capacity of the copy queue
pub const DEFAULT_LOCAL_QUEUE: usize = 100;

/// Settings for a local copy
#[derive(Debug, Clone)]
pub struct LocalCopyConfig {
    /// Tree to copy from
    pub source: PathBuf,
    /// Tree to copy into
    pub destination: PathBuf,
    /// Copy workers
    pub workers: usize,
    /// Bounded queue capacity between walker and workers
    pub queue_capacity: usize,
}

impl LocalCopyConfig {
    /// Config with default worker and queue sizes
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            workers: DEFAULT_LOCAL_WORKERS,
            queue_capacity: DEFAULT_LOCAL_QUEUE,
        }
    }
}

/// Outcome of a local copy
#[derive(Debug)]
pub struct LocalCopyResult {
    /// Files copied
    pub files_copied: u64,
    /// Bytes copied
    pub bytes_copied: u64,
    /// Failed copies as (relative path, error)
    pub failures: Vec<(String, String)>,
    /// Entries the walker could not read
    pub walk_errors: u64,
    /// Total duration
    pub duration: Duration,
}

impl LocalCopyResult {
    /// Check if the copy was completely successful
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.walk_errors == 0
    }

    /// Print summary to console
    pub fn print_summary(&self) {
        println!("\n=== Sync Complete ===");
        println!("Files copied:    {}", self.files_copied);
        println!("Bytes copied:    {}", humansize::format_size(self.bytes_copied, humansize::BINARY));
        println!("Duration:        {:.2?}", self.duration);

        if !self.failures.is_empty() {
            println!("\nFailures: {}", self.failures.len());
            for (path, error) in &self.failures {
                println!("  {} - {}", path, error);
            }
        }
    }
}

enum CopyEvent {
    Copied { relative: String, bytes: u64 },
    Failed { relative: String, error: String },
}

/// Parallel copier between two local directories
pub struct LocalCopier {
    config: LocalCopyConfig,
    hooks: TransferHooks,
    progress: Option<ProgressReporter>,
}

impl LocalCopier {
    /// Create a new copier
    pub fn new(config: LocalCopyConfig) -> Self {
        Self {
            config,
            hooks: TransferHooks::passthrough(),
            progress: None,
        }
    }

    /// Show a live status line while copying
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run the copy to completion
    pub fn execute(self) -> Result<LocalCopyResult> {
        let start = Instant::now();
        let LocalCopyConfig {
            source,
            destination,
            workers,
            queue_capacity,
        } = self.config;

        if !source.is_dir() {
            return Err(NetCopyError::NotFound(source));
        }
        std::fs::create_dir_all(&destination).with_path(&destination)?;

        let (events_tx, events_rx) = unbounded::<CopyEvent>();
        let progress = self.progress.unwrap_or_else(ProgressReporter::disabled);
        let reporter = thread::Builder::new()
            .name("copy-progress".to_string())
            .spawn(move || {
                let mut failures = Vec::new();
                for event in events_rx.iter() {
                    match event {
                        CopyEvent::Copied { relative, bytes } => {
                            let (files, total) = progress.record_file(bytes);
                            progress.set_status(format!("{} files - {}", files, truncate_path(&relative, 60)));
                            tracing::info!(
                                "[OK] copied {} ({} files, {})",
                                relative,
                                files,
                                humansize::format_size(total, humansize::BINARY)
                            );
                        }
                        CopyEvent::Failed { relative, error } => failures.push((relative, error)),
                    }
                }
                progress.finish();
                (progress.files(), progress.bytes(), failures)
            })
            .map_err(|e| NetCopyError::ThreadPoolError(e.to_string()))?;

        let (jobs_tx, jobs_rx) = bounded::<TransferJob>(queue_capacity.max(1));
        let hooks = self.hooks;
        let dest_root = destination.clone();
        let worker_events = events_tx.clone();
        let pool = WorkerPool::spawn("copy", workers, jobs_rx, move |worker_id, job: TransferJob| {
            copy_job(worker_id, &job, &dest_root, &hooks, &worker_events)
        })?;
        drop(events_tx);

        let walker = DirectoryWalker::new(&source);
        let walk_stats = walker.feed(jobs_tx);

        pool.join()?;
        let (files_copied, bytes_copied, failures) = reporter
            .join()
            .map_err(|_| NetCopyError::ThreadPoolError("progress thread panicked".to_string()))?;

        let result = LocalCopyResult {
            files_copied,
            bytes_copied,
            failures,
            walk_errors: walk_stats.errors,
            duration: start.elapsed(),
        };
        tracing::info!(
            "sync complete: {} files, {} in {:.2?}",
            result.files_copied,
            humansize::format_size(result.bytes_copied, humansize::BINARY),
            result.duration
        );
        Ok(result)
    }
}

fn copy_job(
    worker_id: usize,
    job: &TransferJob,
    dest_root: &Path,
    hooks: &TransferHooks,
    events: &Sender<CopyEvent>,
) {
    let copied = resolve_wire_path(dest_root, &job.relative).and_then(|dest| {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).with_path(parent)?;
        }
        copy_file(&job.source, &dest, hooks)
    });

    let event = match copied {
        Ok(stats) => CopyEvent::Copied {
            relative: job.relative.clone(),
            bytes: stats.bytes_copied,
        },
        Err(e) => {
            tracing::error!("Worker {}: failed to copy {}: {}", worker_id, job.relative, e);
            CopyEvent::Failed {
                relative: job.relative.clone(),
                error: e.to_string(),
            }
        }
    };
    if events.send(event).is_err() {
        tracing::debug!(
            "Worker {}: progress thread gone, {} not reported",
            worker_id,
            job.relative
        );
    }
}

/// Copy `source` into `dest` with default settings
pub fn local_copy(source: &Path, dest: &Path) -> Result<LocalCopyResult> {
    LocalCopier::new(LocalCopyConfig::new(source, dest)).execute()
}
