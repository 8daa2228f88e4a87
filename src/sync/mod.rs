//! Resume support
//!
//! The checkpoint log records every relative path whose body reached the
//! server. A resumed run skips those paths.

mod checkpoint;

pub use checkpoint::*;
