//! Progress reporting module
//!
//! Live status lines, periodic transfer progress, and the end-of-run
//! summary.

mod reporter;

pub use reporter::*;
