//! File system operations module
//!
//! Source tree walking, directory listing, and the body streaming path
//! with its compression and throttling seams.

mod lister;
mod operations;
mod walker;
pub mod compress;
pub mod throttle;

pub use lister::*;
pub use operations::*;
pub use walker::*;
pub use compress::{codec_for, IdentityCodec, StreamCodec};
pub use throttle::{throttle_for, BandwidthLimit, Throttle, Unthrottled};
