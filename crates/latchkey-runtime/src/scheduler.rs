//! Fixed-period tick source.

use std::time::{Duration, Instant};

use tokio::time::{Interval, MissedTickBehavior, interval};

/// Periodic tick source for the state machines.
///
/// Ticks missed while the event loop was busy are delivered back to back,
/// so the number of ticks observed always matches elapsed time.
#[derive(Debug)]
pub struct TickScheduler {
    interval: Interval,
    period: Duration,
}

impl TickScheduler {
    /// Create a scheduler. A zero period is raised to one millisecond.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
        Self { interval, period }
    }

    /// Wait for the next tick and return when it was due.
    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await.into_std()
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}
