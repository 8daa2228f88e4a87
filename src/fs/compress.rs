//! Stream compression seam
//!
//! Codecs wrap the writer a file body flows into: the client wraps the
//! socket, the server wraps the destination file. Only the identity
//! codec exists today; gzip and LZ4 are accepted on the command line and
//! fall back to identity with a warning.

use crate::config::Compression;
use std::io::Write;
use std::sync::Arc;

/// A codec applied to file bodies on the wire
pub trait StreamCodec: Send + Sync {
    /// Codec name for logging
    fn name(&self) -> &'static str;

    /// Wrap the sending side (bytes written are encoded into `inner`)
    fn encoder<'a>(&self, inner: Box<dyn Write + 'a>) -> Box<dyn Write + 'a>;

    /// Wrap the receiving side (bytes written are decoded into `inner`)
    fn decoder<'a>(&self, inner: Box<dyn Write + 'a>) -> Box<dyn Write + 'a>;
}

/// Pass-through codec
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl StreamCodec for IdentityCodec {
    fn name(&self) -> &'static str {
        "none"
    }

    fn encoder<'a>(&self, inner: Box<dyn Write + 'a>) -> Box<dyn Write + 'a> {
        inner
    }

    fn decoder<'a>(&self, inner: Box<dyn Write + 'a>) -> Box<dyn Write + 'a> {
        inner
    }
}

/// Select the codec for a requested compression mode
pub fn codec_for(compression: Compression) -> Arc<dyn StreamCodec> {
    match compression {
        Compression::None => Arc::new(IdentityCodec),
        Compression::Gzip | Compression::Lz4 => {
            tracing::warn!(
                "{} compression is not supported yet; sending raw bytes",
                compression.name()
            );
            Arc::new(IdentityCodec)
        }
    }
}
