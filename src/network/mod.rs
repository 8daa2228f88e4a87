//! Network transfer module
//!
//! Raw TCP, one file per connection, authenticated by a shared key:
//!
//! ```text
//! <key>\n
//! __ping__\n            -> server answers __pong__\n
//! __close__\n           -> server ends the handler
//! <relative/path>\n<body bytes until end-of-stream>
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! # receiving machine
//! netcopy --mode server --dir /srv/incoming --key s3cret
//!
//! # sending machine
//! netcopy --mode client --dir ./data --host receiver --key s3cret --resume
//! ```

pub mod protocol;
mod handler;
mod server;
mod client;

pub use protocol::*;
pub use handler::*;
pub use server::*;
pub use client::*;
