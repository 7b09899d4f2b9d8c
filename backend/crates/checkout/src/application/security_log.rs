//! Security Event Log
//!
//! Persists abuse-relevant events next to the tracing output, bounded to the
//! latest [`SECURITY_LOG_CAPACITY`] entries.

use std::sync::Arc;

use kernel::id::SecurityEventId;
use platform::clock::Clock;

use crate::domain::entities::{SecurityActivity, SecurityEvent};
use crate::domain::repository::{RateLimitRepository, SecurityLogRepository};
use crate::domain::value_objects::DeviceId;
use crate::error::CheckoutResult;

pub const SECURITY_LOG_CAPACITY: usize = 100;

pub struct SecurityLog<R>
where
    R: SecurityLogRepository + RateLimitRepository,
{
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> SecurityLog<R>
where
    R: SecurityLogRepository + RateLimitRepository,
{
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Append an event; a storage failure is logged and swallowed
    pub async fn record(&self, device_id: &DeviceId, user_agent: &str, activity: SecurityActivity) {
        tracing::warn!(
            device_id = %device_id,
            activity = activity.label(),
            "Security event"
        );

        let event = SecurityEvent {
            id: SecurityEventId::new(),
            timestamp: self.clock.now(),
            device_id: device_id.clone(),
            user_agent: user_agent.to_string(),
            activity,
        };
        if let Err(e) = self
            .repo
            .append_event(&event, SECURITY_LOG_CAPACITY)
            .await
        {
            tracing::error!(error = %e, event_id = %event.id, "Failed to persist security event");
        }
    }

    /// Retained events, newest first
    pub async fn list(&self) -> CheckoutResult<Vec<SecurityEvent>> {
        let mut events = self.repo.events().await?;
        events.reverse();
        Ok(events)
    }

    /// Lift a device's rate-limit block and forget its order history
    pub async fn clear_device_block(&self, device_id: &DeviceId) -> CheckoutResult<()> {
        self.repo.remove(device_id).await?;
        tracing::info!(device_id = %device_id, "Device block cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::DeviceRecord;
    use crate::infra::kv::KvRepository;
    use chrono::{TimeDelta, TimeZone, Utc};
    use platform::clock::ManualClock;
    use platform::storage::MemoryStore;

    fn setup() -> (
        Arc<ManualClock>,
        Arc<KvRepository<MemoryStore>>,
        SecurityLog<KvRepository<MemoryStore>>,
    ) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap(),
        ));
        let repo = Arc::new(KvRepository::new(MemoryStore::new()));
        let log = SecurityLog::new(repo.clone(), clock.clone());
        (clock, repo, log)
    }

    #[tokio::test]
    async fn test_log_is_bounded_fifo() {
        let (clock, _repo, log) = setup();
        let device = DeviceId::new("dev");

        for i in 0..(SECURITY_LOG_CAPACITY + 5) {
            log.record(
                &device,
                "Mozilla/5.0",
                SecurityActivity::ChallengeFailed {
                    reason: format!("attempt {i}"),
                },
            )
            .await;
            clock.advance(TimeDelta::seconds(1));
        }

        let events = log.list().await.unwrap();
        assert_eq!(events.len(), SECURITY_LOG_CAPACITY);
        assert_eq!(
            events[0].activity,
            SecurityActivity::ChallengeFailed {
                reason: format!("attempt {}", SECURITY_LOG_CAPACITY + 4)
            }
        );
        assert_eq!(
            events[SECURITY_LOG_CAPACITY - 1].activity,
            SecurityActivity::ChallengeFailed {
                reason: "attempt 5".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_clear_device_block() {
        let (clock, repo, log) = setup();
        let device = DeviceId::new("blocked");
        let record = DeviceRecord {
            order_timestamps: vec![clock.now()],
            blocked: true,
            block_until: Some(clock.now() + TimeDelta::days(1)),
        };
        RateLimitRepository::save(repo.as_ref(), &device, &record)
            .await
            .unwrap();

        log.clear_device_block(&device).await.unwrap();
        assert!(RateLimitRepository::load(repo.as_ref(), &device).await.unwrap().is_none());
    }
}
