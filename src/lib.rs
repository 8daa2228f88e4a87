//! # NetCopy - Resumable Directory Transfer over TCP
//!
//! NetCopy moves a directory tree from a client machine to a server
//! machine over raw TCP, one connection per file, authenticated by a
//! static shared key. Completed files are recorded in a checkpoint log
//! so an interrupted run can be resumed.
//!
//! ## Features
//!
//! - **Parallel Senders**: Fixed pool of client connections fed by a bounded queue
//! - **Bounded Server**: Fixed pool of connection handlers
//! - **Resume**: Append-only checkpoint log of completed relative paths
//! - **Liveness Probe**: `__ping__` / `__pong__` before any transfer
//! - **Local Copier**: Parallel copy between two local directories
//!
//! ## Quick Start
//!
//! ```no_run
//! use netcopy::config::{Mode, SharedKey, TransferConfig};
//! use netcopy::core::TransferPipeline;
//!
//! let key = SharedKey::new("s3cret").unwrap();
//! let mut config = TransferConfig::new(Mode::Client, "/data", key);
//! config.host = "backup01".to_string();
//! config.resume = true;
//!
//! let summary = TransferPipeline::new(config).run().unwrap();
//! println!("Sent {} files ({} bytes)", summary.files_sent, summary.bytes_sent);
//! ```
//!
//! ## Server
//!
//! ```no_run
//! use netcopy::config::{Mode, SharedKey, TransferConfig};
//! use netcopy::network::TransferServer;
//!
//! let key = SharedKey::new("s3cret").unwrap();
//! let config = TransferConfig::new(Mode::Server, "/srv/incoming", key);
//! TransferServer::bind(&config).unwrap().run().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod error;
pub mod fs;
pub mod hash;
pub mod logging;
pub mod network;
pub mod progress;
pub mod sync;

// Re-export commonly used types
pub use config::{Mode, SharedKey, TransferConfig};
pub use core::{LocalCopier, LocalCopyConfig, TransferPipeline};
pub use error::{NetCopyError, Result};
pub use network::{TransferClient, TransferServer};
pub use progress::{ProgressReporter, RunSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use netcopy::prelude::*;
    //! ```

    pub use crate::config::{Mode, SharedKey, TransferConfig};
    pub use crate::core::{local_copy, LocalCopier, LocalCopyConfig, LocalCopyResult, TransferPipeline};
    pub use crate::error::{NetCopyError, Result};
    pub use crate::fs::{DirectoryWalker, TransferHooks, TransferJob};
    pub use crate::network::{TransferClient, TransferServer};
    pub use crate::progress::{ProgressReporter, RunSummary};
    pub use crate::sync::{Checkpoint, CompletionLedger};
}
