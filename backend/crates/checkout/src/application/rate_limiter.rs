//! Rate Limiter
//!
//! Per-device sliding window with a temporary block. `check` runs before an
//! order is accepted; `record` only after the order was persisted, so
//! rejected attempts never consume quota.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use platform::clock::Clock;

use crate::application::config::SecurityConfig;
use crate::domain::entities::DeviceRecord;
use crate::domain::repository::RateLimitRepository;
use crate::domain::value_objects::DeviceId;
use crate::error::{CheckoutError, CheckoutResult};

/// Outcome of a rate-limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed {
        /// Orders left in the current window, this one included
        remaining: u32,
    },
    Blocked {
        message: String,
        retry_after_minutes: i64,
    },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }

    pub fn into_result(self) -> CheckoutResult<u32> {
        match self {
            RateLimitDecision::Allowed { remaining } => Ok(remaining),
            RateLimitDecision::Blocked {
                message,
                retry_after_minutes,
            } => Err(CheckoutError::RateLimited {
                message,
                retry_after_minutes,
            }),
        }
    }
}

pub struct RateLimiter<R>
where
    R: RateLimitRepository,
{
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> RateLimiter<R>
where
    R: RateLimitRepository,
{
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub async fn check(
        &self,
        device_id: &DeviceId,
        config: &SecurityConfig,
    ) -> CheckoutResult<RateLimitDecision> {
        let now = self.clock.now();
        let loaded = self.repo.load(device_id).await?;
        let mut dirty = false;
        let mut record = loaded.unwrap_or_default();

        if record.blocked {
            match record.block_until {
                Some(until) if now < until => {
                    let minutes = minutes_until(now, until);
                    return Ok(RateLimitDecision::Blocked {
                        message: format!(
                            "Too many orders from this device. Please try again in {minutes} minutes"
                        ),
                        retry_after_minutes: minutes,
                    });
                }
                _ => {
                    tracing::info!(device_id = %device_id, "Device block expired");
                    record = DeviceRecord::default();
                    dirty = true;
                }
            }
        }

        let window = config.rate_limit();
        let before = record.order_timestamps.len();
        window.prune(&mut record.order_timestamps, now);
        dirty |= record.order_timestamps.len() != before;

        let result = window.evaluate(&record.order_timestamps);
        if !result.allowed {
            let until = now + config.block_duration();
            record.blocked = true;
            record.block_until = Some(until);
            self.repo.save(device_id, &record).await?;

            let minutes = minutes_until(now, until);
            tracing::warn!(
                device_id = %device_id,
                count = result.count,
                block_minutes = minutes,
                "Device blocked by rate limit"
            );
            return Ok(RateLimitDecision::Blocked {
                message: format!(
                    "Order limit reached: at most {} orders per {} minutes. Please try again in {minutes} minutes",
                    window.effective_max(),
                    config.time_window.max(0)
                ),
                retry_after_minutes: minutes,
            });
        }

        if dirty {
            self.repo.save(device_id, &record).await?;
        }

        Ok(RateLimitDecision::Allowed {
            remaining: result.remaining,
        })
    }

    /// Count an accepted order against the device
    pub async fn record(&self, device_id: &DeviceId) -> CheckoutResult<()> {
        let now = self.clock.now();
        let mut record = self.repo.load(device_id).await?.unwrap_or_default();
        record.order_timestamps.push(now);
        self.repo.save(device_id, &record).await
    }

    /// Drop the block and the history of a device
    pub async fn clear(&self, device_id: &DeviceId) -> CheckoutResult<()> {
        self.repo.remove(device_id).await
    }
}

/// Whole minutes until `until`, rounded up, at least 1
fn minutes_until(now: DateTime<Utc>, until: DateTime<Utc>) -> i64 {
    let secs = until.signed_duration_since(now).num_seconds().max(0);
    ((secs + 59) / 60).max(1)
}
