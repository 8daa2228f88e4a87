//! Per-connection handler
//!
//! A session starts in `AwaitKey`. The first line must equal the shared
//! key; anything else ends the session without a reply. Once
//! authenticated, each line is a control token or a destination-relative
//! path whose body runs to end-of-stream.

use super::protocol::{classify_line, read_line, resolve_wire_path, write_line, ControlLine, PONG};
use super::STREAM_BUFFER_SIZE;
use crate::config::SharedKey;
use crate::error::{IoResultExt, NetCopyError, Result};
use crate::fs::{StreamDirection, TransferHooks};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counters shared by every handler of a server
#[derive(Debug, Default)]
pub struct ServerStats {
    files_received: AtomicU64,
    bytes_received: AtomicU64,
    active_handlers: AtomicUsize,
    peak_handlers: AtomicUsize,
    rejected: AtomicU64,
}

impl ServerStats {
    /// Files fully written to disk
    pub fn files_received(&self) -> u64 {
        self.files_received.load(Ordering::Relaxed)
    }

    /// Bytes written to disk
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    /// Handlers currently serving a connection
    pub fn active_handlers(&self) -> usize {
        self.active_handlers.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously active handlers
    pub fn peak_handlers(&self) -> usize {
        self.peak_handlers.load(Ordering::SeqCst)
    }

    /// Sessions refused for a wrong or missing key
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    fn enter(&self) -> ActiveHandler<'_> {
        let now = self.active_handlers.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_handlers.fetch_max(now, Ordering::SeqCst);
        ActiveHandler { stats: self }
    }

    fn record_file(&self, bytes: u64) {
        self.files_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }
}

struct ActiveHandler<'a> {
    stats: &'a ServerStats,
}

impl Drop for ActiveHandler<'_> {
    fn drop(&mut self) {
        self.stats.active_handlers.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    AwaitKey,
    Authenticated,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Wrong or missing key
    AuthRejected,
    /// The peer sent the close token
    CloseSignal,
    /// End of stream
    PeerClosed,
}

/// Serves accepted connections below a destination root
pub struct ConnectionHandler {
    root: PathBuf,
    key: SharedKey,
    hooks: TransferHooks,
    stats: Arc<ServerStats>,
}

impl ConnectionHandler {
    /// Create a handler writing below `root`
    pub fn new(
        root: impl Into<PathBuf>,
        key: SharedKey,
        hooks: TransferHooks,
        stats: Arc<ServerStats>,
    ) -> Self {
        Self {
            root: root.into(),
            key,
            hooks,
            stats,
        }
    }

    /// Serve one connection to completion, logging any failure
    pub fn serve(&self, worker_id: usize, stream: TcpStream, peer: SocketAddr) {
        let _active = self.stats.enter();

        match self.handle(stream, peer) {
            Ok(SessionEnd::AuthRejected) => {
                tracing::warn!("Handler {}: rejected {} (invalid key)", worker_id, peer);
            }
            Ok(end) => {
                tracing::debug!("Handler {}: session with {} ended ({:?})", worker_id, peer, end);
            }
            Err(e) => {
                tracing::error!("Handler {}: session with {} failed: {}", worker_id, peer, e);
            }
        }
    }

    /// Run the session state machine over `stream`
    pub fn handle(&self, stream: TcpStream, peer: SocketAddr) -> Result<SessionEnd> {
        let peer_name = peer.to_string();
        let mut writer = stream
            .try_clone()
            .map_err(|e| NetCopyError::connection(&peer_name, e.to_string()))?;
        let mut reader = BufReader::with_capacity(STREAM_BUFFER_SIZE, stream);
        let mut state = SessionState::AwaitKey;

        loop {
            let line = match read_line(&mut reader) {
                Ok(Some(line)) => line,
                Ok(None) if state == SessionState::AwaitKey => return Ok(self.reject()),
                Ok(None) => return Ok(SessionEnd::PeerClosed),
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    return Err(NetCopyError::ProtocolError(format!("{}: {}", peer_name, e)))
                }
                Err(e) => return Err(NetCopyError::connection(&peer_name, e.to_string())),
            };

            if state == SessionState::AwaitKey {
                if !self.key.matches(&line) {
                    return Ok(self.reject());
                }
                state = SessionState::Authenticated;
                continue;
            }

            match classify_line(&line) {
                ControlLine::Close => return Ok(SessionEnd::CloseSignal),
                ControlLine::Ping => {
                    if let Err(e) = write_line(&mut writer, PONG).and_then(|_| writer.flush()) {
                        tracing::warn!("Failed to answer ping from {}: {}", peer_name, e);
                    }
                }
                ControlLine::Path(relative) => {
                    if let Err(e) = self.receive_file(relative, &mut reader) {
                        abort_connection(&writer, &peer_name);
                        return Err(e);
                    }
                }
            }
        }
    }

    fn reject(&self) -> SessionEnd {
        self.stats.rejected.fetch_add(1, Ordering::Relaxed);
        SessionEnd::AuthRejected
    }

    /// Write the remaining stream into `root/relative`
    fn receive_file<R: Read>(&self, relative: &str, body: &mut R) -> Result<u64> {
        let dest = resolve_wire_path(&self.root, relative)?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).with_path(parent)?;
        }

        let file = File::create(&dest).with_path(&dest)?;
        let mut writer = BufWriter::with_capacity(STREAM_BUFFER_SIZE, file);
        let stats = self
            .hooks
            .copy_stream(body, &mut writer, StreamDirection::Incoming)
            .with_path(&dest)?;
        writer.flush().with_path(&dest)?;
        drop(writer);

        self.stats.record_file(stats.bytes_copied);
        tracing::info!("Saved {} ({} bytes)", relative, stats.bytes_copied);
        Ok(stats.bytes_copied)
    }
}

/// Make the coming close send a reset instead of a FIN, so a sender
/// draining to end-of-stream sees the failure.
fn abort_connection(stream: &TcpStream, peer: &str) {
    if let Err(e) = socket2::SockRef::from(stream).set_linger(Some(Duration::ZERO)) {
        tracing::debug!("Failed to set linger on connection to {}: {}", peer, e);
    }
}
