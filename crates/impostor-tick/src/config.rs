//! Tick scheduler configuration.

use std::time::Duration;

use tracing::warn;

/// What to do when the driver wakes up later than one tick period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Forget the missed ticks and schedule the next one a full period
    /// from now.
    #[default]
    Skip,
    /// Keep the original schedule; missed ticks fire back to back.
    Drop,
}

/// Configuration for [`TickScheduler`](crate::TickScheduler).
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Ticks per second, `1..=MAX_TICK_RATE_HZ`.
    pub tick_rate_hz: u32,
    pub policy: TickPolicy,
    /// Fraction of the tick period (0.0 to 1.0) the driver may spend
    /// before a warning is logged.
    pub budget_warn_threshold: f64,
    /// Random delay (0 to this many ms) added before the first tick, so
    /// several servers started together do not tick in lockstep.
    pub initial_jitter_ms: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 1,
            policy: TickPolicy::default(),
            budget_warn_threshold: 0.80,
            initial_jitter_ms: 0,
        }
    }
}

impl TickConfig {
    /// Countdowns are shown in whole seconds; more than this is wasted work.
    pub const MAX_TICK_RATE_HZ: u32 = 10;

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values, logging each adjustment.
    pub fn validated(mut self) -> Self {
        if self.tick_rate_hz == 0 {
            warn!("tick_rate_hz must be at least 1, using 1");
            self.tick_rate_hz = 1;
        }
        if self.tick_rate_hz > Self::MAX_TICK_RATE_HZ {
            warn!(
                rate = self.tick_rate_hz,
                max = Self::MAX_TICK_RATE_HZ,
                "tick_rate_hz too high, clamping"
            );
            self.tick_rate_hz = Self::MAX_TICK_RATE_HZ;
        }
        if !(0.0..=1.0).contains(&self.budget_warn_threshold) {
            warn!(
                threshold = self.budget_warn_threshold,
                "budget_warn_threshold out of range, clamping"
            );
            self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        }
        self
    }

    /// Length of one tick period.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate_hz.max(1)
    }
}
