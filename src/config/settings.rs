//! Configuration settings for NetCopy
//!
//! Defines the command line surface, the value enums behind it, and the
//! validated [`TransferConfig`] handed to the server and client entry
//! points.

use crate::error::{NetCopyError, Result};
use crate::network::{DEFAULT_CHECKPOINT_FILE, DEFAULT_PORT, DEFAULT_WORKERS, MAX_LINE_LEN};
use clap::{ArgAction, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// NetCopy - resumable directory transfer over raw TCP
#[derive(Parser, Debug, Clone)]
#[command(name = "netcopy")]
#[command(author = "NetCopy Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Move a directory tree to a remote machine over TCP, with resume")]
#[command(long_about = r#"
NetCopy sends every regular file below a directory to a NetCopy server,
one TCP connection per file, authenticated by a shared key.

Examples:
  netcopy --mode server --dir /srv/incoming --key s3cret
  netcopy --mode client --dir ./data --host backup01 --key s3cret --workers 32
  netcopy --mode client --dir ./data --host backup01 --key s3cret --resume
  netcopy --mode dir --dir ./data
"#)]
pub struct CliArgs {
    /// Operating mode
    #[arg(long, value_enum, default_value = "client")]
    pub mode: Mode,

    /// Directory to send from (client), receive into (server) or list (dir)
    #[arg(long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Server address to connect to (client only)
    #[arg(long, default_value = "localhost", value_name = "ADDR")]
    pub host: String,

    /// Port to connect to or listen on
    #[arg(long, default_value_t = DEFAULT_PORT, value_name = "PORT")]
    pub port: u16,

    /// Address to listen on (server only)
    #[arg(long, default_value = "0.0.0.0", value_name = "ADDR")]
    pub bind: String,

    /// Number of parallel connections (client) or handlers (server)
    #[arg(long, default_value_t = DEFAULT_WORKERS, value_name = "NUM")]
    pub workers: usize,

    /// Skip files already recorded in the checkpoint log (client only)
    #[arg(long)]
    pub resume: bool,

    /// Checkpoint log location
    #[arg(long, default_value = DEFAULT_CHECKPOINT_FILE, value_name = "PATH")]
    pub checkpoint: PathBuf,

    /// Stream compression (accepted, not applied yet)
    #[arg(long, value_enum, default_value = "none")]
    pub compress: Compression,

    /// MD5 integrity verification (accepted, not applied yet)
    #[arg(long)]
    pub checksum: bool,

    /// Bandwidth cap in Mbps, 0 = unlimited (accepted, not applied yet)
    #[arg(long = "max-bandwidth", default_value_t = 0, value_name = "MBPS")]
    pub max_bandwidth: u64,

    /// Shared key, identical on client and server
    #[arg(long, env = "NETCOPY_KEY", hide_env_values = true, value_name = "KEY")]
    pub key: Option<String>,

    /// Format of the summary printed at the end of a client run
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (warnings and errors only)
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

/// Operating mode
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Send a directory tree to a server
    #[default]
    Client,
    /// Receive directory trees from clients
    Server,
    /// List a local directory and exit
    Dir,
}

/// Stream compression codec
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Raw bytes
    #[default]
    None,
    /// gzip
    Gzip,
    /// LZ4
    Lz4,
}

impl Compression {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Lz4 => "lz4",
        }
    }
}

/// Integrity verification mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumMode {
    /// No verification
    #[default]
    None,
    /// MD5 digest of every file
    Md5,
}

/// Output format for reports
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
}

/// Secret sent as the first line of every connection.
///
/// Never printed: `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedKey(String);

impl SharedKey {
    /// Validate and wrap a key
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(NetCopyError::config("shared key (--key) must not be empty"));
        }
        if key.contains('\n') || key.contains('\r') {
            return Err(NetCopyError::config("shared key (--key) must be a single line"));
        }
        if key.len() > MAX_LINE_LEN {
            return Err(NetCopyError::config(format!(
                "shared key (--key) must be at most {} bytes",
                MAX_LINE_LEN
            )));
        }
        Ok(Self(key))
    }

    /// The key as sent on the wire
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a line received from a peer
    pub fn matches(&self, line: &str) -> bool {
        self.0 == line
    }
}

impl fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedKey(***)")
    }
}

/// Validated configuration for client and server runs
#[derive(Debug, Clone, Serialize)]
pub struct TransferConfig {
    /// Client or server
    pub mode: Mode,
    /// Source root (client) or destination root (server)
    pub root: PathBuf,
    /// Server host the client dials
    pub host: String,
    /// Port to dial or listen on
    pub port: u16,
    /// Listen address for the server
    pub bind: String,
    /// Worker count
    pub workers: usize,
    /// Skip checkpointed files
    pub resume: bool,
    /// Checkpoint log location
    pub checkpoint_path: PathBuf,
    /// Requested compression
    pub compress: Compression,
    /// Requested integrity verification
    pub checksum: ChecksumMode,
    /// Requested bandwidth cap in Mbps (0 = unlimited)
    pub max_bandwidth_mbps: u64,
    /// Summary format
    pub output_format: OutputFormat,
    /// Shared key
    #[serde(skip)]
    pub key: SharedKey,
}

impl TransferConfig {
    /// Configuration with defaults for everything but the root and key
    pub fn new(mode: Mode, root: impl Into<PathBuf>, key: SharedKey) -> Self {
        Self {
            mode,
            root: root.into(),
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            bind: "0.0.0.0".to_string(),
            workers: DEFAULT_WORKERS,
            resume: false,
            checkpoint_path: PathBuf::from(DEFAULT_CHECKPOINT_FILE),
            compress: Compression::None,
            checksum: ChecksumMode::None,
            max_bandwidth_mbps: 0,
            output_format: OutputFormat::Text,
            key,
        }
    }

    /// Create config from CLI arguments
    ///
    /// Only client and server runs carry a transfer configuration.
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        if args.mode == Mode::Dir {
            return Err(NetCopyError::config("dir mode does not take a transfer configuration"));
        }

        let root = args
            .dir
            .clone()
            .ok_or_else(|| NetCopyError::config("the --dir parameter is required"))?;
        let key = args
            .key
            .as_deref()
            .ok_or_else(|| NetCopyError::config("the shared key (--key) is required"))
            .and_then(SharedKey::new)?;

        if args.workers == 0 {
            return Err(NetCopyError::config("--workers must be at least 1"));
        }

        let mut config = Self::new(args.mode, root, key);
        config.host = args.host.clone();
        config.port = args.port;
        config.bind = args.bind.clone();
        config.workers = args.workers;
        config.resume = args.resume;
        config.checkpoint_path = args.checkpoint.clone();
        config.compress = args.compress;
        config.checksum = if args.checksum {
            ChecksumMode::Md5
        } else {
            ChecksumMode::None
        };
        config.max_bandwidth_mbps = args.max_bandwidth;
        config.output_format = args.output_format;

        Ok(config)
    }

    /// Address the client dials
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Address the server listens on
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
