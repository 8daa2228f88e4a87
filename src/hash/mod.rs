//! Integrity verification module
//!
//! Hook for per-file digests computed while a body is streamed.

mod integrity;

pub use integrity::*;
