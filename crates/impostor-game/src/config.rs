//! Registry configuration.
//!
//! Per-session tunables live in [`impostor_protocol::SessionConfig`]
//! because clients send them; this module holds the knobs only the
//! server operator sets.

use serde::{Deserialize, Serialize};

/// Settings shared by every session a [`SessionRegistry`](crate::SessionRegistry)
/// creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Capacity of each session's command channel. When it is full,
    /// senders wait (backpressure) instead of growing memory.
    pub channel_size: usize,

    /// Fixed seed for the session RNGs. `None` seeds from the OS.
    ///
    /// Each session derives its seed as `rng_seed + n` where `n` counts
    /// sessions created so far, so a seeded registry replays the same
    /// deals in the same order.
    pub rng_seed: Option<u64>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            channel_size: 64,
            rng_seed: None,
        }
    }
}

impl RegistryConfig {
    /// Fixes values that would make the registry unusable.
    pub fn validated(mut self) -> Self {
        if self.channel_size == 0 {
            tracing::warn!("channel_size must be at least 1, using 1");
            self.channel_size = 1;
        }
        self
    }
}
