//! Core engine module
//!
//! The worker pool shared by every side, the client transfer pipeline,
//! and the local copier.

mod copier;
mod pipeline;
mod scheduler;

pub use copier::*;
pub use pipeline::*;
pub use scheduler::*;
