use crate::behavior::BehaviorSimulator;
use easyapply_common::{ApplyError, EngineSettings};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// Sliding-window limiter over step actions.
///
/// Every call to [`reserve`](Self::reserve) books a slot, possibly in the
/// future, so callers that wait and then act never exceed `capacity` actions
/// in any `window`.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: usize,
    window: Duration,
    slots: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self {
            capacity: capacity.max(1) as usize,
            window,
            slots: VecDeque::new(),
        }
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new(settings.actions_per_hour, settings.rate_window())
    }

    fn prune(&mut self, now: Instant) {
        while self
            .slots
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= self.window)
        {
            self.slots.pop_front();
        }
    }

    /// Book one action and return how long to wait before performing it.
    pub fn reserve(&mut self, now: Instant) -> Duration {
        self.prune(now);
        if self.slots.len() < self.capacity {
            self.slots.push_back(now);
            return Duration::ZERO;
        }
        let slot = self.slots[self.slots.len() - self.capacity] + self.window;
        self.slots.push_back(slot);
        slot.saturating_duration_since(now)
    }

    /// Actions that may run right now without waiting.
    pub fn available(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.capacity.saturating_sub(self.slots.len())
    }

    /// Book an action and suspend until its slot arrives.
    pub async fn acquire(&mut self, pacer: &BehaviorSimulator) -> Result<Duration, ApplyError> {
        let wait = self.reserve(Instant::now());
        if !wait.is_zero() {
            info!(
                target: "easyapply.rate",
                wait_secs = wait.as_secs_f64(),
                capacity = self.capacity,
                window_secs = self.window.as_secs(),
                "action budget exhausted; waiting"
            );
            pacer.suspend(wait).await?;
        }
        Ok(wait)
    }
}
