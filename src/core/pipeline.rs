//! Client transfer pipeline
//!
//! probe -> checkpoint -> walker -> sender pool -> close signal.
//! Per-file failures are logged and counted; only configuration and
//! probe failures abort the run.

use crate::config::TransferConfig;
use crate::core::WorkerPool;
use crate::error::{NetCopyError, Result};
use crate::fs::{DirectoryWalker, TransferHooks, TransferJob};
use crate::network::{TransferClient, JOB_QUEUE_CAPACITY, PROBE_TIMEOUT, PROGRESS_BATCH};
use crate::progress::{log_batch_progress, RunSummary};
use crate::sync::{Checkpoint, CompletionLedger};
use crossbeam::channel::bounded;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// One client run over a source tree
pub struct TransferPipeline {
    config: TransferConfig,
    hooks: TransferHooks,
}

impl TransferPipeline {
    /// Prepare a run; capability warnings are logged here
    pub fn new(config: TransferConfig) -> Self {
        let hooks = TransferHooks::from_config(&config);
        Self { config, hooks }
    }

    /// Configuration of this run
    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Send every file below the root that is not yet checkpointed
    pub fn run(&self) -> Result<RunSummary> {
        let start = Instant::now();
        let client = Arc::new(TransferClient::new(&self.config, self.hooks.clone()));

        let probe_rtt = client.probe(PROBE_TIMEOUT)?;
        tracing::info!("Server {} is reachable (rtt {:.2?})", client.addr(), probe_rtt);

        let checkpoint = if self.config.resume {
            let checkpoint = Checkpoint::load(&self.config.checkpoint_path)?;
            tracing::info!(
                "Resuming: {} files already transferred according to {}",
                checkpoint.len(),
                self.config.checkpoint_path.display()
            );
            checkpoint
        } else {
            Checkpoint::empty()
        };
        let ledger = Arc::new(CompletionLedger::open(&self.config.checkpoint_path)?);

        let (jobs_tx, jobs_rx) = bounded::<TransferJob>(JOB_QUEUE_CAPACITY);
        let sender = Arc::clone(&client);
        let sender_ledger = Arc::clone(&ledger);
        let pool = WorkerPool::spawn("sender", self.config.workers, jobs_rx, move |worker_id, job: TransferJob| {
            send_job(worker_id, &job, &sender, &sender_ledger)
        })?;

        let walker = DirectoryWalker::new(&self.config.root).with_checkpoint(checkpoint);
        let walk = thread::Builder::new()
            .name("walker".to_string())
            .spawn(move || walker.feed(jobs_tx))
            .map_err(|e| NetCopyError::ThreadPoolError(e.to_string()))?;

        let walk_stats = walk
            .join()
            .map_err(|_| NetCopyError::ThreadPoolError("walker thread panicked".to_string()))?;
        pool.join()?;

        if let Err(e) = client.send_close() {
            tracing::warn!("Failed to send close signal: {}", e);
        }

        let done = ledger.snapshot();
        let duration = start.elapsed();
        let secs = duration.as_secs_f64();
        let summary = RunSummary {
            files_sent: done.files_completed,
            bytes_sent: done.bytes_completed,
            files_failed: done.files_failed,
            files_skipped: walk_stats.skipped,
            walk_errors: walk_stats.errors,
            probe_rtt,
            duration,
            throughput: if secs > 0.0 {
                done.bytes_completed as f64 / secs
            } else {
                0.0
            },
        };

        tracing::info!(
            "Transfer finished: {} sent, {} failed, {} skipped",
            summary.files_sent,
            summary.files_failed,
            summary.files_skipped
        );
        Ok(summary)
    }
}

fn send_job(worker_id: usize, job: &TransferJob, client: &TransferClient, ledger: &CompletionLedger) {
    match client.send_file(job) {
        Ok(bytes) => {
            let (snapshot, appended) = ledger.record_success(&job.relative, bytes);
            if let Err(e) = appended {
                tracing::error!("Worker {}: sent {} but could not checkpoint it: {}", worker_id, job.relative, e);
            }
            tracing::debug!("Worker {}: sent {} ({} bytes)", worker_id, job.relative, bytes);
            log_batch_progress(&snapshot, PROGRESS_BATCH);
        }
        Err(e) => {
            ledger.record_failure();
            tracing::error!("Worker {}: error sending {}: {}", worker_id, job.relative, e);
        }
    }
}
