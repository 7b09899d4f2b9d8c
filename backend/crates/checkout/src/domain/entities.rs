//! Domain Entities
//!
//! Supporting entities of the checkout domain. The order aggregate lives in
//! [`crate::domain::order`] and the cart in [`crate::domain::cart`].

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use kernel::id::SecurityEventId;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Amount, CouponKind, DeviceId, MemberTier, RiskLevel};

/// Lifetime of an issued arithmetic challenge
pub const CHALLENGE_TTL_MINUTES: i64 = 5;

/// Arithmetic challenge held by a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub question: String,
    pub answer: i64,
    pub issued_at: DateTime<Utc>,
}

impl Challenge {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + TimeDelta::minutes(CHALLENGE_TTL_MINUTES)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.issued_at) > TimeDelta::minutes(CHALLENGE_TTL_MINUTES)
    }
}

/// Per-device rate-limit state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub order_timestamps: Vec<DateTime<Utc>>,
    pub blocked: bool,
    pub block_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub code: String,
    pub kind: CouponKind,
    pub value: Amount,
    pub min_order_amount: Amount,
    pub max_discount: Amount,
    /// Last day the coupon can be used
    pub expiry: NaiveDate,
    pub description: String,
}

impl Coupon {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.date_naive() > self.expiry
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    pub total_spent: Amount,
    pub total_orders: i64,
    pub points: i64,
}

impl Member {
    pub fn tier(&self) -> MemberTier {
        MemberTier::for_total_spent(self.total_spent)
    }

    /// Book a completed order and return the points earned (1 per NT$100)
    pub fn record_order(&mut self, order_total: Amount) -> i64 {
        let earned = order_total.max(0) / 100;
        self.points += earned;
        self.total_orders += 1;
        self.total_spent += order_total.max(0);
        earned
    }

    /// Deduct `points` if the balance covers them
    pub fn spend_points(&mut self, points: i64) -> bool {
        if points < 0 || self.points < points {
            return false;
        }
        self.points -= points;
        true
    }
}

/// Security-relevant activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityActivity {
    RateLimitExceeded {
        message: String,
    },
    ChallengeFailed {
        reason: String,
    },
    #[serde(rename_all = "camelCase")]
    SuspiciousOrder {
        order_number: String,
        flags: Vec<String>,
        risk_level: RiskLevel,
    },
    #[serde(rename_all = "camelCase")]
    OrderSubmissionError {
        order_number: Option<String>,
        error: String,
    },
}

impl SecurityActivity {
    pub fn label(&self) -> &'static str {
        match self {
            SecurityActivity::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            SecurityActivity::ChallengeFailed { .. } => "CHALLENGE_FAILED",
            SecurityActivity::SuspiciousOrder { .. } => "SUSPICIOUS_ORDER",
            SecurityActivity::OrderSubmissionError { .. } => "ORDER_SUBMISSION_ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEvent {
    pub id: SecurityEventId,
    pub timestamp: DateTime<Utc>,
    pub device_id: DeviceId,
    pub user_agent: String,
    pub activity: SecurityActivity,
}
