//! Byte-rate flood protection.
//!
//! Each session gets its own governor token bucket in which one cell is one
//! received byte. Chunks larger than the burst can never pass.

use crate::config::SecurityConfig;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;

/// Per-session received-bytes limiter.
#[derive(Debug)]
pub struct FloodGuard {
    limiter: DefaultDirectRateLimiter,
}

impl FloodGuard {
    pub fn from_config(config: &SecurityConfig) -> Self {
        let rate = NonZeroU32::new(config.flood_bytes_per_sec).unwrap_or(nonzero!(4096u32));
        let burst = NonZeroU32::new(config.flood_burst_bytes).unwrap_or(nonzero!(16384u32));
        Self {
            limiter: RateLimiter::direct(Quota::per_second(rate).allow_burst(burst)),
        }
    }

    /// Account for `bytes` just received.
    ///
    /// Returns `false` if the session is sending faster than allowed.
    pub fn check(&self, bytes: usize) -> bool {
        let Some(cells) = u32::try_from(bytes).ok().and_then(NonZeroU32::new) else {
            return bytes == 0;
        };
        matches!(self.limiter.check_n(cells), Ok(Ok(())))
    }
}
