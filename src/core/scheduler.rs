//! Fixed-size worker pool
//!
//! N named threads drain one bounded crossbeam queue until every sender
//! is dropped and the queue is empty. The client senders, the server
//! handlers and the local copier all run on this pool, so the number of
//! tasks in flight is bounded by the worker count.

use crate::error::{NetCopyError, Result};
use crossbeam::channel::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A running pool of worker threads
pub struct WorkerPool {
    name: String,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `workers` threads, each calling `work(worker_id, task)` for
    /// every task pulled from `tasks`.
    pub fn spawn<T, F>(name: &str, workers: usize, tasks: Receiver<T>, work: F) -> Result<Self>
    where
        T: Send + 'static,
        F: Fn(usize, T) + Send + Sync + 'static,
    {
        if workers == 0 {
            return Err(NetCopyError::ThreadPoolError(format!(
                "{} pool needs at least one worker",
                name
            )));
        }

        let work = Arc::new(work);
        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let tasks = tasks.clone();
            let work = Arc::clone(&work);
            let label = name.to_string();

            let handle = thread::Builder::new()
                .name(format!("{}-{}", name, worker_id))
                .spawn(move || {
                    for task in tasks.iter() {
                        work(worker_id, task);
                    }
                    tracing::debug!("{} worker {} shutting down", label, worker_id);
                })
                .map_err(|e| NetCopyError::ThreadPoolError(e.to_string()))?;

            handles.push(handle);
        }

        Ok(Self {
            name: name.to_string(),
            handles,
        })
    }

    /// Number of workers
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the pool has no workers
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to drain the queue and exit
    pub fn join(self) -> Result<()> {
        let mut panicked = 0;
        for handle in self.handles {
            if handle.join().is_err() {
                panicked += 1;
            }
        }

        if panicked > 0 {
            return Err(NetCopyError::ThreadPoolError(format!(
                "{} of the {} workers panicked",
                panicked, self.name
            )));
        }
        Ok(())
    }
}
