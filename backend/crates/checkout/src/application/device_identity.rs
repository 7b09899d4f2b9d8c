//! Device Identity
//!
//! Maps a browser profile to a stable device token. The token is a heuristic
//! anti-abuse signal, never an authentication credential. A profile is a
//! checkout session, so stored tokens are released when sessions expire.

use std::sync::Arc;

use platform::fingerprint::DeviceSignals;

use crate::application::session::SessionRegistry;
use crate::domain::repository::DeviceFingerprintRepository;
use crate::domain::value_objects::DeviceId;

pub struct DeviceIdentity<R>
where
    R: DeviceFingerprintRepository,
{
    repo: Arc<R>,
}

impl<R> DeviceIdentity<R>
where
    R: DeviceFingerprintRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Device token for `profile_id`
    ///
    /// The first token computed for a profile is stored and returned on every
    /// later call, so drifting signals (a resized window, an updated browser)
    /// do not change the identity. Storage failures degrade to the freshly
    /// computed token.
    pub async fn resolve(&self, profile_id: &str, signals: &DeviceSignals) -> DeviceId {
        match self.repo.device_for_profile(profile_id).await {
            Ok(Some(device_id)) => return device_id,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored device id");
                return DeviceId::new(signals.token());
            }
        }

        let device_id = DeviceId::new(signals.token());
        if let Err(e) = self.repo.store_device(profile_id, &device_id).await {
            tracing::warn!(error = %e, device_id = %device_id, "Failed to store device id");
        } else {
            tracing::debug!(device_id = %device_id, "New device id stored");
        }
        device_id
    }

    /// Purge idle sessions along with their stored device tokens
    ///
    /// Returns the number of sessions removed.
    pub async fn purge_expired(&self, sessions: &SessionRegistry) -> usize {
        let expired = sessions.purge_expired().await;
        for id in &expired {
            if let Err(e) = self.repo.forget_device(&id.to_string()).await {
                tracing::warn!(error = %e, session_id = %id, "Failed to drop stored device id");
            }
        }
        expired.len()
    }
}
