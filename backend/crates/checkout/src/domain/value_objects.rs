//! Domain Value Objects
//!
//! Immutable value types for the checkout domain.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Money in whole New Taiwan dollars
pub type Amount = i64;

/// Coarse per-browser identifier used for abuse heuristics
///
/// Derived from spoofable environment signals. It scopes rate limits, coupon
/// usage and fraud lookback; it is not an authentication credential and must
/// not be treated as one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `ORD{YYYYMMDD}{4 digits}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn generate(now: DateTime<Utc>) -> Self {
        Self(format!(
            "ORD{}{}",
            now.format("%Y%m%d"),
            platform::crypto::random_digits(4)
        ))
    }

    pub fn parse(value: &str) -> Option<Self> {
        let digits = value.strip_prefix("ORD")?;
        (digits.len() == 12 && digits.bytes().all(|b| b.is_ascii_digit()))
            .then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supported payment methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "COD")]
    CashOnDelivery,
    #[serde(rename = "TRANSFER")]
    BankTransfer,
    #[serde(rename = "CREDIT_CARD")]
    CreditCard,
    #[serde(rename = "LINE_PAY")]
    LinePay,
    #[serde(rename = "JKOPAY")]
    JkoPay,
    #[serde(rename = "ATM")]
    Atm,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 6] = [
        PaymentMethod::CashOnDelivery,
        PaymentMethod::BankTransfer,
        PaymentMethod::CreditCard,
        PaymentMethod::LinePay,
        PaymentMethod::JkoPay,
        PaymentMethod::Atm,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "COD",
            PaymentMethod::BankTransfer => "TRANSFER",
            PaymentMethod::CreditCard => "CREDIT_CARD",
            PaymentMethod::LinePay => "LINE_PAY",
            PaymentMethod::JkoPay => "JKOPAY",
            PaymentMethod::Atm => "ATM",
        }
    }

    /// Handling fee charged by the method; recorded on the confirmation only
    pub fn fee(&self) -> Amount {
        match self {
            PaymentMethod::CashOnDelivery => 30,
            PaymentMethod::Atm => 10,
            _ => 0,
        }
    }

    /// Methods settled online at submission time
    pub fn is_online(&self) -> bool {
        matches!(
            self,
            PaymentMethod::CreditCard | PaymentMethod::LinePay | PaymentMethod::JkoPay
        )
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        PaymentMethod::ALL
            .into_iter()
            .find(|m| m.code() == code)
            .ok_or_else(|| format!("Unknown payment method: {}", s.trim()))
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Forward-only transitions; cancellation is possible until shipment
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Processing)
                | (Confirmed, Cancelled)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// Fraud risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_flag_count(count: usize) -> Self {
        match count {
            0 => RiskLevel::Low,
            1 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

/// Member tier, derived from lifetime spend
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl MemberTier {
    pub fn for_total_spent(total_spent: Amount) -> Self {
        match total_spent {
            s if s >= 50_000 => MemberTier::Platinum,
            s if s >= 20_000 => MemberTier::Gold,
            s if s >= 5_000 => MemberTier::Silver,
            _ => MemberTier::Bronze,
        }
    }

    pub fn discount_percent(&self) -> i64 {
        match self {
            MemberTier::Bronze => 0,
            MemberTier::Silver => 5,
            MemberTier::Gold => 10,
            MemberTier::Platinum => 15,
        }
    }
}

/// How a coupon reduces the order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CouponKind {
    /// `value` percent off the order amount
    Percentage,
    /// Flat `value` off
    Fixed,
    /// Shipping covered up to `value`
    FreeShipping,
}
