//! Transfer client connections
//!
//! Every file travels on its own connection: key line, path line, raw
//! body, then a write shutdown. The client waits for the server to close
//! its side, so a file counts as sent only after the handler has
//! finished writing it.

use super::protocol::{read_line, write_line, CLOSE, PING, PONG, STREAM_BUFFER_SIZE};
use crate::config::{SharedKey, TransferConfig};
use crate::error::{IoResultExt, NetCopyError, Result};
use crate::fs::{StreamDirection, TransferHooks, TransferJob};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

/// Sending side of a transfer
#[derive(Debug, Clone)]
pub struct TransferClient {
    addr: String,
    key: SharedKey,
    hooks: TransferHooks,
}

impl TransferClient {
    /// Client for the server named in `config`
    pub fn new(config: &TransferConfig, hooks: TransferHooks) -> Self {
        Self {
            addr: config.server_addr(),
            key: config.key.clone(),
            hooks,
        }
    }

    /// Server address
    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn connect(&self) -> Result<TcpStream> {
        TcpStream::connect(&self.addr).map_err(|e| NetCopyError::connection(&self.addr, e.to_string()))
    }

    /// Check that the server is reachable and accepts the key.
    ///
    /// Returns the round-trip time of the ping.
    pub fn probe(&self, timeout: Duration) -> Result<Duration> {
        let start = Instant::now();
        let addrs = self
            .addr
            .to_socket_addrs()
            .map_err(|e| NetCopyError::probe(&self.addr, e.to_string()))?;

        let mut last_error = None;
        let mut connected = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    connected = Some(stream);
                    break;
                }
                Err(e) => last_error = Some(e),
            }
        }
        let stream = connected.ok_or_else(|| {
            let message = last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "address did not resolve".to_string());
            NetCopyError::probe(&self.addr, message)
        })?;

        let probe_err = |e: io::Error| NetCopyError::probe(&self.addr, e.to_string());
        stream.set_read_timeout(Some(timeout)).map_err(probe_err)?;
        stream.set_write_timeout(Some(timeout)).map_err(probe_err)?;

        let mut writer = &stream;
        write_line(&mut writer, self.key.as_str())
            .and_then(|_| write_line(&mut writer, PING))
            .and_then(|_| writer.flush())
            .map_err(probe_err)?;

        let mut reader = BufReader::new(&stream);
        match read_line(&mut reader) {
            Ok(Some(line)) if line == PONG => Ok(start.elapsed()),
            Ok(Some(line)) => Err(NetCopyError::probe(
                &self.addr,
                format!("unexpected reply '{}'", line),
            )),
            Ok(None) => Err(NetCopyError::probe(
                &self.addr,
                "connection closed without a reply (wrong key?)",
            )),
            Err(e) => Err(probe_err(e)),
        }
    }

    /// Send one file and wait for the server to finish with it
    pub fn send_file(&self, job: &TransferJob) -> Result<u64> {
        let file = File::open(&job.source).with_path(&job.source)?;
        let mut body = BufReader::with_capacity(STREAM_BUFFER_SIZE, file);

        let stream = self.connect()?;
        let wire_err = |e: io::Error| {
            NetCopyError::connection(&self.addr, format!("sending {}: {}", job.relative, e))
        };

        let mut writer = BufWriter::with_capacity(STREAM_BUFFER_SIZE, &stream);
        write_line(&mut writer, self.key.as_str()).map_err(wire_err)?;
        write_line(&mut writer, &job.relative).map_err(wire_err)?;
        let stats = self
            .hooks
            .copy_stream(&mut body, &mut writer, StreamDirection::Outgoing)
            .map_err(wire_err)?;
        writer.flush().map_err(wire_err)?;
        drop(writer);

        stream.shutdown(Shutdown::Write).map_err(wire_err)?;
        io::copy(&mut &stream, &mut io::sink()).map_err(wire_err)?;

        Ok(stats.bytes_copied)
    }

    /// Tell the server this run is done
    pub fn send_close(&self) -> Result<()> {
        let stream = self.connect()?;
        let mut writer = &stream;
        write_line(&mut writer, self.key.as_str())
            .and_then(|_| write_line(&mut writer, CLOSE))
            .and_then(|_| writer.flush())
            .and_then(|_| stream.shutdown(Shutdown::Write))
            .map_err(|e| NetCopyError::connection(&self.addr, e.to_string()))
    }
}
