//! Line protocol shared by client and server
//!
//! Every connection starts with the shared key on its own line. Each
//! following line is either a control token or a destination-relative
//! path; a path line is followed by the raw file body running to
//! end-of-stream.

use crate::error::{NetCopyError, Result};
use std::io::{self, BufRead, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Liveness request
pub const PING: &str = "__ping__";

/// Liveness reply
pub const PONG: &str = "__pong__";

/// Ends the handler that receives it
pub const CLOSE: &str = "__close__";

/// Default port to listen on and dial
pub const DEFAULT_PORT: u16 = 9090;

/// Default worker count on both sides
pub const DEFAULT_WORKERS: usize = 16;

/// Checkpoint log name, relative to the working directory
pub const DEFAULT_CHECKPOINT_FILE: &str = "checkpoint.log";

/// Capacity of the client job queue
pub const JOB_QUEUE_CAPACITY: usize = 3000;

/// Completed files between progress lines
pub const PROGRESS_BATCH: u64 = 3000;

/// Bound on the connectivity probe (connect and reply)
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Longest accepted line, terminator excluded
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Buffer size for file bodies
pub const STREAM_BUFFER_SIZE: usize = 256 * 1024;

/// Interpretation of a line received after authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlLine<'a> {
    /// End this handler
    Close,
    /// Reply with a pong
    Ping,
    /// Destination-relative path, body follows
    Path(&'a str),
}

/// Classify a line received after the key
pub fn classify_line(line: &str) -> ControlLine<'_> {
    match line {
        CLOSE => ControlLine::Close,
        PING => ControlLine::Ping,
        path => ControlLine::Path(path),
    }
}

/// Read one line, without its `\n` or `\r\n` terminator.
///
/// Returns `None` at end-of-stream. A final line without terminator is
/// still returned.
pub fn read_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    let read = reader
        .by_ref()
        .take(MAX_LINE_LEN as u64 + 1)
        .read_until(b'\n', &mut buf)?;

    if read == 0 {
        return Ok(None);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if buf.len() > MAX_LINE_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line exceeds {} bytes", MAX_LINE_LEN),
        ));
    }

    String::from_utf8(buf)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Write one line followed by `\n`
pub fn write_line<W: Write>(writer: &mut W, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")
}

/// Wire form of a path relative to the transfer root: components
/// joined with `/`.
pub fn to_wire_path(relative: &Path) -> Result<String> {
    let display = relative.to_string_lossy();
    let mut parts = Vec::new();

    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| NetCopyError::invalid_path(display.as_ref(), "not valid UTF-8"))?;
                parts.push(part);
            }
            Component::CurDir => {}
            _ => {
                return Err(NetCopyError::invalid_path(
                    display.as_ref(),
                    "not relative to the transfer root",
                ))
            }
        }
    }

    let wire = parts.join("/");
    if wire.is_empty() {
        return Err(NetCopyError::invalid_path(display.as_ref(), "empty path"));
    }
    if wire.contains('\n') || wire.contains('\r') {
        return Err(NetCopyError::invalid_path(display.as_ref(), "contains a line break"));
    }
    if wire == PING || wire == CLOSE {
        return Err(NetCopyError::invalid_path(display.as_ref(), "collides with a control token"));
    }

    Ok(wire)
}

/// Resolve a received path line below `root`.
///
/// Absolute paths and `..` components are refused so a peer cannot
/// write outside the destination root.
pub fn resolve_wire_path(root: &Path, line: &str) -> Result<PathBuf> {
    if line.starts_with('/') {
        return Err(NetCopyError::invalid_path(line, "absolute paths are not allowed"));
    }

    let mut resolved = root.to_path_buf();
    let mut depth = 0usize;

    for part in line.split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                return Err(NetCopyError::invalid_path(line, "parent components are not allowed"))
            }
            _ => {
                let mut components = Path::new(part).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(name)), None) => {
                        resolved.push(name);
                        depth += 1;
                    }
                    _ => {
                        return Err(NetCopyError::invalid_path(line, "unsupported path component"))
                    }
                }
            }
        }
    }

    if depth == 0 {
        return Err(NetCopyError::invalid_path(line, "empty path"));
    }

    Ok(resolved)
}
