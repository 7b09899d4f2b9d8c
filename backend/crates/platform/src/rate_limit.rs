//! Sliding-window counting
//!
//! A window keeps the instants of recent events and forgets the ones older
//! than its width. The per-device blocking policy on top of it lives with the
//! checkout rate limiter.

use chrono::{DateTime, TimeDelta, Utc};

/// Window limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum events allowed inside the window
    pub max_events: u32,
    /// Window width
    pub window: TimeDelta,
}

impl RateLimitConfig {
    pub fn new(max_events: u32, window: TimeDelta) -> Self {
        Self { max_events, window }
    }

    /// A window of zero or negative width cannot age anything out
    pub fn is_degenerate(&self) -> bool {
        self.window <= TimeDelta::zero()
    }

    /// Effective limit: a degenerate window allows exactly one event, and a
    /// limit of zero is treated as one so the first event is never refused
    pub fn effective_max(&self) -> u32 {
        if self.is_degenerate() {
            1
        } else {
            self.max_events.max(1)
        }
    }

    /// Drop events that fell out of the window
    pub fn prune(&self, events: &mut Vec<DateTime<Utc>>, now: DateTime<Utc>) {
        if self.is_degenerate() {
            return;
        }
        events.retain(|t| now.signed_duration_since(*t) < self.window);
    }

    /// Evaluate an already pruned event list
    pub fn evaluate(&self, events: &[DateTime<Utc>]) -> RateLimitResult {
        let limit = self.effective_max();
        let count = u32::try_from(events.len()).unwrap_or(u32::MAX);
        RateLimitResult {
            allowed: count < limit,
            count,
            remaining: limit.saturating_sub(count),
        }
    }
}

/// Window check result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub count: u32,
    pub remaining: u32,
}
