//! Fixed-window request budget.

use std::time::Duration;

use tokio::time::Instant;

/// Admits at most `limit` requests per `interval`.
///
/// A window opens with the first request admitted after the previous window
/// expired; requests beyond the budget are told how long until it resets.
#[derive(Debug, Clone)]
pub struct FixedWindow {
    limit: u32,
    interval: Duration,
    opened_at: Option<Instant>,
    used: u32,
}

impl FixedWindow {
    /// A zero `limit` is treated as one.
    pub fn new(limit: u32, interval: Duration) -> Self {
        Self {
            limit: limit.max(1),
            interval,
            opened_at: None,
            used: 0,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Take one unit of budget, or return the time left until the window resets.
    pub fn try_acquire(&mut self, now: Instant) -> Result<(), Duration> {
        match self.opened_at {
            Some(opened) if now.saturating_duration_since(opened) < self.interval => {
                if self.used < self.limit {
                    self.used += 1;
                    Ok(())
                } else {
                    Err(self.interval - now.saturating_duration_since(opened))
                }
            }
            _ => {
                self.opened_at = Some(now);
                self.used = 1;
                Ok(())
            }
        }
    }

    /// Budget left in the window that is open at `now`.
    pub fn remaining(&self, now: Instant) -> u32 {
        match self.opened_at {
            Some(opened) if now.saturating_duration_since(opened) < self.interval => {
                self.limit - self.used
            }
            _ => self.limit,
        }
    }
}
