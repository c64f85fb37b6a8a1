use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

use crate::{TickConfig, TickPolicy};

/// Returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickInfo {
    /// 1-based tick number.
    pub tick: u64,
    /// The fixed tick period.
    pub dt: Duration,
    /// `true` if the tick fired more than 10% of a period late.
    pub overrun: bool,
    /// Ticks dropped because of this overrun (Skip policy only).
    pub ticks_skipped: u64,
}

/// Counters kept by the scheduler. Timing covers the span between
/// `wait_for_tick` returning and `record_tick_end`.
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
    pub last_tick_time: Duration,
    pub max_tick_time: Duration,
}

/// Wakes its owner at a fixed rate.
pub struct TickScheduler {
    config: TickConfig,
    tick_duration: Duration,
    tick_count: u64,
    next_tick: Instant,
    tick_start: Option<Instant>,
    paused: bool,
    metrics: TickMetrics,
}

impl TickScheduler {
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let tick_duration = config.tick_duration();
        let jitter = if config.initial_jitter_ms > 0 {
            Duration::from_millis(rand::rng().random_range(0..config.initial_jitter_ms))
        } else {
            Duration::ZERO
        };

        debug!(
            rate_hz = config.tick_rate_hz,
            policy = ?config.policy,
            jitter_ms = jitter.as_millis() as u64,
            "tick scheduler created"
        );

        Self {
            next_tick: Instant::now() + tick_duration + jitter,
            config,
            tick_duration,
            tick_count: 0,
            tick_start: None,
            paused: false,
            metrics: TickMetrics::default(),
        }
    }

    /// Waits for the next tick. Pends forever while paused, which lets a
    /// `select!` loop keep serving its other branches.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        if self.paused {
            return std::future::pending().await;
        }

        let scheduled = self.next_tick;
        time::sleep_until(scheduled).await;

        let now = Instant::now();
        self.tick_count += 1;
        self.tick_start = Some(now);

        let late_by = now.saturating_duration_since(scheduled);
        let overrun = late_by > self.tick_duration / 10;
        let mut ticks_skipped = 0;

        self.next_tick = match self.config.policy {
            TickPolicy::Skip => {
                if overrun {
                    ticks_skipped = (late_by.as_nanos() / self.tick_duration.as_nanos()) as u64;
                    if ticks_skipped > 0 {
                        warn!(
                            tick = self.tick_count,
                            late_ms = late_by.as_millis() as u64,
                            skipped = ticks_skipped,
                            "tick late, skipping missed ticks"
                        );
                    }
                }
                if overrun {
                    now + self.tick_duration
                } else {
                    scheduled + self.tick_duration
                }
            }
            TickPolicy::Drop => {
                if overrun {
                    warn!(
                        tick = self.tick_count,
                        late_ms = late_by.as_millis() as u64,
                        "tick late, keeping schedule"
                    );
                }
                scheduled + self.tick_duration
            }
        };

        self.metrics.total_ticks += 1;
        self.metrics.total_skipped += ticks_skipped;
        if overrun {
            self.metrics.total_overruns += 1;
        }
        trace!(tick = self.tick_count, overrun, "tick");

        TickInfo {
            tick: self.tick_count,
            dt: self.tick_duration,
            overrun,
            ticks_skipped,
        }
    }

    /// Marks the work for the current tick as done and checks it against
    /// the budget. Does nothing if no tick is in progress.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        self.metrics.last_tick_time = elapsed;
        self.metrics.max_tick_time = self.metrics.max_tick_time.max(elapsed);

        let utilization = elapsed.as_secs_f64() / self.tick_duration.as_secs_f64();
        if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = self.tick_duration.as_millis() as u64,
                "tick work close to budget"
            );
        }
    }

    /// Stops ticking until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "tick scheduler paused");
        }
    }

    /// Resumes a full period from now, so time spent paused is not
    /// replayed as a burst of ticks.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next_tick = Instant::now() + self.tick_duration;
            debug!(tick = self.tick_count, "tick scheduler resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }
}
