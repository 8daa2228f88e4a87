//! Transfer server
//!
//! The accept loop pushes each connection onto a bounded queue drained
//! by a fixed pool of handler threads. When every handler is busy and
//! the queue is full, the loop blocks and new peers wait in the
//! listen backlog.

use super::handler::{ConnectionHandler, ServerStats};
use crate::config::TransferConfig;
use crate::core::WorkerPool;
use crate::error::{NetCopyError, Result};
use crate::fs::TransferHooks;
use crossbeam::channel::bounded;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Receiving side of a transfer
pub struct TransferServer {
    listener: TcpListener,
    root: PathBuf,
    workers: usize,
    handler: Arc<ConnectionHandler>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<ServerStats>,
}

impl TransferServer {
    /// Bind the listener described by `config`
    pub fn bind(config: &TransferConfig) -> Result<Self> {
        if config.workers == 0 {
            return Err(NetCopyError::config("--workers must be at least 1"));
        }

        let addr = config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .map_err(|e| NetCopyError::connection(&addr, e.to_string()))?;

        let stats = Arc::new(ServerStats::default());
        let handler = ConnectionHandler::new(
            config.root.clone(),
            config.key.clone(),
            TransferHooks::from_config(config),
            Arc::clone(&stats),
        );

        Ok(Self {
            listener,
            root: config.root.clone(),
            workers: config.workers,
            handler: Arc::new(handler),
            shutdown: Arc::new(AtomicBool::new(false)),
            stats,
        })
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Destination root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get shutdown flag for external control
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Shared counters
    pub fn stats(&self) -> Arc<ServerStats> {
        Arc::clone(&self.stats)
    }

    /// Run the server (blocking) until the shutdown flag is raised
    pub fn run(&self) -> Result<()> {
        self.listener
            .set_nonblocking(true)
            .map_err(|e| NetCopyError::connection("listener", e.to_string()))?;

        let (queue, accepted) = bounded::<(TcpStream, SocketAddr)>(self.workers);
        let handler = Arc::clone(&self.handler);
        let pool = WorkerPool::spawn("handler", self.workers, accepted, move |worker_id, (stream, peer)| {
            handler.serve(worker_id, stream, peer)
        })?;

        tracing::info!(
            "Listening on {} with {} handlers, writing to {}",
            self.local_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "?".to_string()),
            self.workers,
            self.root.display()
        );

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    tracing::debug!("Accepted connection from {}", peer);

                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::error!("Failed to configure connection from {}: {}", peer, e);
                        continue;
                    }
                    if queue.send((stream, peer)).is_err() {
                        tracing::error!("Handler pool stopped; no longer accepting");
                        break;
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                }
            }
        }

        drop(queue);
        pool.join()?;

        tracing::info!(
            "Server stopped: {} files, {} bytes received",
            self.stats.files_received(),
            self.stats.bytes_received()
        );
        Ok(())
    }
}
