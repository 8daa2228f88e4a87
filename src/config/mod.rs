//! Configuration module for NetCopy
//!
//! Provides the CLI surface and the validated runtime configuration
//! shared by the client and the server.

mod settings;

pub use settings::*;
