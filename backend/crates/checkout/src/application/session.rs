//! Checkout Sessions
//!
//! A session holds what one browser profile accumulates between screens: the
//! cart, the live challenge, the signed-in member and the in-flight flag.
//! Sessions are addressed by an HMAC-signed id carried in a cookie.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use chrono::TimeDelta;
use kernel::id::CheckoutSessionId;
use platform::clock::Clock;
use platform::crypto::{self, TokenError};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::domain::cart::Cart;
use crate::domain::entities::Challenge;
use crate::error::{CheckoutError, CheckoutResult};

#[derive(Debug, Default)]
pub struct SessionState {
    pub cart: Cart,
    pub challenge: Option<Challenge>,
    pub member_id: Option<String>,
}

#[derive(Debug)]
pub struct CheckoutSession {
    id: CheckoutSessionId,
    pub state: Mutex<SessionState>,
    submitting: AtomicBool,
    last_seen_ms: AtomicI64,
}

impl CheckoutSession {
    pub fn new(id: CheckoutSessionId, now_ms: i64) -> Self {
        Self {
            id,
            state: Mutex::new(SessionState::default()),
            submitting: AtomicBool::new(false),
            last_seen_ms: AtomicI64::new(now_ms),
        }
    }

    pub fn id(&self) -> CheckoutSessionId {
        self.id
    }

    /// Claim the session for one submission; released when the guard drops
    pub fn begin_submission(&self) -> CheckoutResult<SubmissionGuard<'_>> {
        self.submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CheckoutError::SubmissionInProgress)?;
        Ok(SubmissionGuard { session: self })
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    fn touch(&self, now_ms: i64) {
        self.last_seen_ms.store(now_ms, Ordering::Relaxed);
    }

    fn idle_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.last_seen_ms.load(Ordering::Relaxed)
    }
}

/// Clears the in-flight flag on drop
#[derive(Debug)]
pub struct SubmissionGuard<'a> {
    session: &'a CheckoutSession,
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        self.session.submitting.store(false, Ordering::Release);
    }
}

/// Live sessions, expiring after an idle TTL
pub struct SessionRegistry {
    sessions: RwLock<HashMap<CheckoutSessionId, Arc<CheckoutSession>>>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl SessionRegistry {
    pub fn new(ttl: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub async fn create(&self) -> Arc<CheckoutSession> {
        let session = Arc::new(CheckoutSession::new(
            CheckoutSessionId::new(),
            self.clock.now_ms(),
        ));
        self.sessions
            .write()
            .await
            .insert(session.id(), session.clone());
        tracing::debug!(session_id = %session.id(), "Checkout session created");
        session
    }

    /// Live session by id; an idle one is reported missing and left for
    /// [`Self::purge_expired`]
    pub async fn get(&self, id: CheckoutSessionId) -> Option<Arc<CheckoutSession>> {
        let now_ms = self.clock.now_ms();
        let session = self.sessions.read().await.get(&id).cloned()?;
        if session.idle_ms(now_ms) > self.ttl.num_milliseconds() {
            tracing::debug!(session_id = %id, "Checkout session expired");
            return None;
        }
        session.touch(now_ms);
        Some(session)
    }

    /// Drop idle sessions and return their ids
    pub async fn purge_expired(&self) -> Vec<CheckoutSessionId> {
        let now_ms = self.clock.now_ms();
        let ttl_ms = self.ttl.num_milliseconds();
        let mut sessions = self.sessions.write().await;
        let expired: Vec<CheckoutSessionId> = sessions
            .iter()
            .filter(|(_, s)| !s.is_submitting() && s.idle_ms(now_ms) > ttl_ms)
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            sessions.remove(id);
        }
        expired
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Cookie value for a session id
pub fn session_token(id: CheckoutSessionId, secret: &[u8]) -> Result<String, TokenError> {
    crypto::sign_id(id.as_uuid().as_bytes(), secret)
}

/// Session id from a cookie value, `None` if the signature does not verify
pub fn parse_session_token(token: &str, secret: &[u8]) -> Option<CheckoutSessionId> {
    crypto::verify_signed_id(token, secret)
        .ok()
        .map(|bytes| CheckoutSessionId::from_uuid(Uuid::from_bytes(bytes)))
}

/// Signed member reference, issued by the member service after sign-in
pub fn member_token(member_id: &str, secret: &[u8]) -> Result<String, TokenError> {
    crypto::sign_value(member_id, secret)
}

/// Member id from a signed member reference
pub fn parse_member_token(token: &str, secret: &[u8]) -> CheckoutResult<String> {
    crypto::verify_signed_value(token.trim(), secret)
        .ok()
        .filter(|member_id| !member_id.trim().is_empty())
        .ok_or(CheckoutError::MemberTokenInvalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use platform::clock::ManualClock;

    fn registry() -> (Arc<ManualClock>, SessionRegistry) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap(),
        ));
        let registry = SessionRegistry::new(TimeDelta::hours(2), clock.clone());
        (clock, registry)
    }

    #[test]
    fn test_submission_guard_is_exclusive() {
        let session = CheckoutSession::new(CheckoutSessionId::new(), 0);
        let guard = session.begin_submission().unwrap();
        assert!(matches!(
            session.begin_submission(),
            Err(CheckoutError::SubmissionInProgress)
        ));
        drop(guard);
        assert!(session.begin_submission().is_ok());
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let (clock, registry) = registry();
        let session = registry.create().await;

        clock.advance(TimeDelta::minutes(90));
        assert!(registry.get(session.id()).await.is_some());

        clock.advance(TimeDelta::minutes(90));
        assert!(registry.get(session.id()).await.is_some());

        clock.advance(TimeDelta::hours(3));
        assert!(registry.get(session.id()).await.is_none());
        assert_eq!(registry.purge_expired().await, vec![session.id()]);
        assert_eq!(registry.len().await, 0);
    }

    #[test]
    fn test_session_token_round_trip() {
        let secret = [7u8; 32];
        let id = CheckoutSessionId::new();
        let token = session_token(id, &secret).unwrap();

        assert_eq!(parse_session_token(&token, &secret), Some(id));
        assert_eq!(parse_session_token(&token, &[8u8; 32]), None);
        assert_eq!(parse_session_token("garbage", &secret), None);
    }

    #[test]
    fn test_member_token_binds_member_id() {
        let secret = [9u8; 32];
        let token = member_token("m1", &secret).unwrap();

        assert_eq!(parse_member_token(&token, &secret).unwrap(), "m1");
        assert!(matches!(
            parse_member_token("m1", &secret),
            Err(CheckoutError::MemberTokenInvalid)
        ));
        assert!(matches!(
            parse_member_token(&member_token("m1", &[1u8; 32]).unwrap(), &secret),
            Err(CheckoutError::MemberTokenInvalid)
        ));
    }
}
