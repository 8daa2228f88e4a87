//! Bandwidth throttling seam
//!
//! A [`Throttle`] is consulted before every chunk of a file body is
//! written. Only the unthrottled variant exists today.

use std::sync::Arc;

/// Requested bandwidth cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BandwidthLimit {
    mbps: u64,
}

impl BandwidthLimit {
    /// Cap in megabits per second, 0 = unlimited
    pub fn from_mbps(mbps: u64) -> Self {
        Self { mbps }
    }

    /// No cap
    pub fn unlimited() -> Self {
        Self { mbps: 0 }
    }

    /// Whether a cap was requested
    pub fn is_unlimited(&self) -> bool {
        self.mbps == 0
    }

    /// Cap in bytes per second, `None` when unlimited
    pub fn bytes_per_second(&self) -> Option<u64> {
        if self.is_unlimited() {
            None
        } else {
            Some(self.mbps.saturating_mul(1_000_000) / 8)
        }
    }
}

/// Rate control applied to outgoing chunks
pub trait Throttle: Send + Sync {
    /// Block until `bytes` may be sent
    fn acquire(&self, bytes: usize);
}

/// No rate control
#[derive(Debug, Clone, Copy, Default)]
pub struct Unthrottled;

impl Throttle for Unthrottled {
    fn acquire(&self, _bytes: usize) {}
}

/// Select the throttle for a requested limit
pub fn throttle_for(limit: BandwidthLimit) -> Arc<dyn Throttle> {
    if let Some(bps) = limit.bytes_per_second() {
        tracing::warn!(
            "bandwidth limiting ({} bytes/s) is not supported yet; sending unthrottled",
            bps
        );
    }
    Arc::new(Unthrottled)
}
