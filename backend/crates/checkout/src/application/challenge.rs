//! Challenge Verifier
//!
//! The live challenge sits in the caller's session slot:
//! `None` → `Some` (issued) → back to `None` on success or expiry.
//! A wrong answer leaves the challenge in place until it expires.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use platform::clock::Clock;

use crate::application::config::CaptchaRange;
use crate::domain::entities::Challenge;
use crate::domain::services::captcha;
use crate::error::{CheckoutError, CheckoutResult};

/// Public part of an issued challenge; the answer stays server-side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedChallenge {
    pub question: String,
    pub expires_at: DateTime<Utc>,
}

pub struct ChallengeVerifier {
    clock: Arc<dyn Clock>,
}

impl ChallengeVerifier {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Issue a fresh challenge, replacing any live one
    pub fn issue(&self, slot: &mut Option<Challenge>, range: CaptchaRange) -> IssuedChallenge {
        let challenge = captcha::generate(range.min, range.max, self.clock.now());
        let issued = IssuedChallenge {
            question: challenge.question.clone(),
            expires_at: challenge.expires_at(),
        };
        *slot = Some(challenge);
        issued
    }

    pub fn verify(&self, slot: &mut Option<Challenge>, answer: i64) -> CheckoutResult<()> {
        let Some(challenge) = slot.as_ref() else {
            return Err(CheckoutError::ChallengeMissing);
        };

        if challenge.is_expired(self.clock.now()) {
            *slot = None;
            return Err(CheckoutError::ChallengeExpired);
        }

        if challenge.answer != answer {
            return Err(CheckoutError::ChallengeIncorrect);
        }

        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use platform::clock::ManualClock;

    fn setup() -> (Arc<ManualClock>, ChallengeVerifier) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        ));
        let verifier = ChallengeVerifier::new(clock.clone());
        (clock, verifier)
    }

    #[test]
    fn test_round_trip() {
        let (_clock, verifier) = setup();
        let mut slot = None;
        verifier.issue(&mut slot, CaptchaRange::default());
        let answer = slot.as_ref().unwrap().answer;

        verifier.verify(&mut slot, answer).unwrap();
        assert!(slot.is_none());
        assert!(matches!(
            verifier.verify(&mut slot, answer),
            Err(CheckoutError::ChallengeMissing)
        ));
    }

    #[test]
    fn test_wrong_answer_keeps_challenge() {
        let (_clock, verifier) = setup();
        let mut slot = None;
        verifier.issue(&mut slot, CaptchaRange::default());
        let answer = slot.as_ref().unwrap().answer;

        assert!(matches!(
            verifier.verify(&mut slot, answer + 1),
            Err(CheckoutError::ChallengeIncorrect)
        ));
        assert!(slot.is_some());
        verifier.verify(&mut slot, answer).unwrap();
    }

    #[test]
    fn test_expired_challenge_is_cleared() {
        let (clock, verifier) = setup();
        let mut slot = None;
        let issued = verifier.issue(&mut slot, CaptchaRange::default());
        let answer = slot.as_ref().unwrap().answer;
        assert_eq!(issued.expires_at, clock.now() + TimeDelta::minutes(5));

        clock.advance(TimeDelta::minutes(5) + TimeDelta::seconds(1));
        assert!(matches!(
            verifier.verify(&mut slot, answer),
            Err(CheckoutError::ChallengeExpired)
        ));
        assert!(slot.is_none());
    }
}
