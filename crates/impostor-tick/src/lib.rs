//! Fixed-rate tick scheduler for session timers.
//!
//! Session deadlines are checked against the clock, not counted in ticks,
//! so the scheduler only has to wake the timer driver roughly once a
//! second. A late or skipped tick delays a countdown update; it never
//! changes when a phase expires.
//!
//! The scheduler is meant to sit in the driver's loop:
//!
//! ```ignore
//! let mut scheduler = TickScheduler::new(TickConfig::default());
//! loop {
//!     tokio::select! {
//!         _ = shutdown.changed() => break,
//!         _ = scheduler.wait_for_tick() => {
//!             for handle in registry.handles() { handle.tick().await; }
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```

mod config;
mod scheduler;

pub use config::{TickConfig, TickPolicy};
pub use scheduler::{TickInfo, TickMetrics, TickScheduler};
