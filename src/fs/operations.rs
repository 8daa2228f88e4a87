//! File body streaming
//!
//! Every byte NetCopy moves, over the network or between local
//! directories, goes through [`TransferHooks::copy_stream`], which routes
//! the body through the compression, integrity and throttling seams.

use crate::config::{ChecksumMode, Compression, TransferConfig};
use crate::error::{IoResultExt, Result};
use crate::fs::compress::{codec_for, StreamCodec};
use crate::fs::throttle::{throttle_for, BandwidthLimit, Throttle};
use crate::hash::{is_supported, new_check};
use crate::network::STREAM_BUFFER_SIZE;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

/// Copy operation statistics
#[derive(Debug, Clone, Default)]
pub struct CopyStats {
    /// Bytes copied
    pub bytes_copied: u64,
    /// Digest of the body, when verification is active
    pub digest: Option<String>,
}

/// Which side of a transfer a stream is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDirection {
    /// Reading a local file, writing to the wire
    Outgoing,
    /// Reading the wire, writing a local file
    Incoming,
}

/// Capability seams applied to file bodies
#[derive(Clone)]
pub struct TransferHooks {
    codec: Arc<dyn StreamCodec>,
    checksum: ChecksumMode,
    throttle: Arc<dyn Throttle>,
    buffer_size: usize,
}

impl TransferHooks {
    /// Build the hooks requested by a configuration.
    ///
    /// Unsupported capabilities are logged once here.
    pub fn from_config(config: &TransferConfig) -> Self {
        Self::new(
            config.compress,
            config.checksum,
            BandwidthLimit::from_mbps(config.max_bandwidth_mbps),
        )
    }

    /// Build hooks from individual settings
    pub fn new(compression: Compression, checksum: ChecksumMode, limit: BandwidthLimit) -> Self {
        if !is_supported(checksum) {
            tracing::warn!("checksum verification is not supported yet; files are not verified");
        }

        Self {
            codec: codec_for(compression),
            checksum,
            throttle: throttle_for(limit),
            buffer_size: STREAM_BUFFER_SIZE,
        }
    }

    /// Raw bytes, no verification, no cap
    pub fn passthrough() -> Self {
        Self::new(Compression::None, ChecksumMode::None, BandwidthLimit::unlimited())
    }

    /// Name of the active codec
    pub fn codec_name(&self) -> &'static str {
        self.codec.name()
    }

    /// Stream `reader` to end-of-stream into `writer`
    pub fn copy_stream<R: Read, W: Write>(
        &self,
        reader: &mut R,
        writer: &mut W,
        direction: StreamDirection,
    ) -> io::Result<CopyStats> {
        let sink: Box<dyn Write + '_> = Box::new(writer);
        let mut sink = match direction {
            StreamDirection::Outgoing => self.codec.encoder(sink),
            StreamDirection::Incoming => self.codec.decoder(sink),
        };
        let mut check = new_check(self.checksum);
        let mut buffer = vec![0u8; self.buffer_size];
        let mut total = 0u64;

        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            self.throttle.acquire(read);
            check.update(&buffer[..read]);
            sink.write_all(&buffer[..read])?;
            total += read as u64;
        }

        sink.flush()?;

        Ok(CopyStats {
            bytes_copied: total,
            digest: check.finish(),
        })
    }
}

impl std::fmt::Debug for TransferHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferHooks")
            .field("codec", &self.codec.name())
            .field("checksum", &self.checksum)
            .field("buffer_size", &self.buffer_size)
            .finish()
    }
}

/// Copy one local file, creating or truncating the destination
pub fn copy_file(source: &Path, dest: &Path, hooks: &TransferHooks) -> Result<CopyStats> {
    let src_file = File::open(source).with_path(source)?;
    let mut reader = BufReader::new(src_file);

    let dst_file = File::create(dest).with_path(dest)?;
    let mut writer = BufWriter::new(dst_file);

    let stats = hooks
        .copy_stream(&mut reader, &mut writer, StreamDirection::Incoming)
        .with_path(dest)?;
    writer.flush().with_path(dest)?;

    Ok(stats)
}
