//! Repository Traits
//!
//! Ports for persistence and external collaborators. Implementations live in
//! the infrastructure layer.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::domain::entities::{Coupon, DeviceRecord, Member, SecurityEvent};
use crate::domain::order::{Order, PaymentConfirmation};
use crate::domain::value_objects::{Amount, DeviceId, OrderNumber, OrderStatus, PaymentMethod};
use crate::error::CheckoutResult;

/// Authoritative product prices
pub trait Catalog: Send + Sync {
    /// Price of `product_id` in `size`, `None` if the pair is not sold
    fn resolve(&self, product_id: &str, size: &str) -> Option<Amount>;
}

/// Durable order log
#[trait_variant::make(OrderRepository: Send)]
pub trait LocalOrderRepository {
    async fn append(&self, order: &Order) -> CheckoutResult<()>;

    async fn exists(&self, order_number: &OrderNumber) -> CheckoutResult<bool>;

    async fn find(&self, order_number: &OrderNumber) -> CheckoutResult<Option<Order>>;

    async fn find_by_contact(&self, phone: &str, email: &str) -> CheckoutResult<Vec<Order>>;

    /// Orders placed by `device_id` at or after `since`
    async fn recent_for_device(
        &self,
        device_id: &DeviceId,
        since: DateTime<Utc>,
    ) -> CheckoutResult<Vec<Order>>;

    async fn update_status(
        &self,
        order_number: &OrderNumber,
        status: OrderStatus,
        note: &str,
        at: DateTime<Utc>,
    ) -> CheckoutResult<Order>;

    async fn set_tracking_number(
        &self,
        order_number: &OrderNumber,
        tracking_number: &str,
    ) -> CheckoutResult<Order>;
}

/// Per-device rate-limit table
#[trait_variant::make(RateLimitRepository: Send)]
pub trait LocalRateLimitRepository {
    async fn load(&self, device_id: &DeviceId) -> CheckoutResult<Option<DeviceRecord>>;

    async fn save(&self, device_id: &DeviceId, record: &DeviceRecord) -> CheckoutResult<()>;

    async fn remove(&self, device_id: &DeviceId) -> CheckoutResult<()>;
}

/// Coupon codes already redeemed per device, and coupons bought with points
#[trait_variant::make(CouponUsageRepository: Send)]
pub trait LocalCouponUsageRepository {
    async fn used_codes(&self, device_id: &DeviceId) -> CheckoutResult<HashSet<String>>;

    async fn mark_used(&self, device_id: &DeviceId, code: &str) -> CheckoutResult<()>;

    /// Unspent coupons granted to `device_id`, in grant order
    async fn granted_coupons(&self, device_id: &DeviceId) -> CheckoutResult<Vec<Coupon>>;

    async fn grant_coupon(&self, device_id: &DeviceId, coupon: &Coupon) -> CheckoutResult<()>;

    /// Spend one granted coupon with `code`; `false` if none was granted
    async fn consume_granted(&self, device_id: &DeviceId, code: &str) -> CheckoutResult<bool>;
}

/// One stored device token per browser profile
#[trait_variant::make(DeviceFingerprintRepository: Send)]
pub trait LocalDeviceFingerprintRepository {
    async fn device_for_profile(&self, profile_id: &str) -> CheckoutResult<Option<DeviceId>>;

    async fn store_device(&self, profile_id: &str, device_id: &DeviceId) -> CheckoutResult<()>;

    async fn forget_device(&self, profile_id: &str) -> CheckoutResult<()>;
}

/// Bounded security event log
#[trait_variant::make(SecurityLogRepository: Send)]
pub trait LocalSecurityLogRepository {
    /// Append, evicting the oldest entries beyond `capacity`
    async fn append_event(&self, event: &SecurityEvent, capacity: usize) -> CheckoutResult<()>;

    /// All retained events, oldest first
    async fn events(&self) -> CheckoutResult<Vec<SecurityEvent>>;
}

/// Member accounts, used for tier discounts and points
#[trait_variant::make(MemberDirectory: Send)]
pub trait LocalMemberDirectory {
    async fn member(&self, member_id: &str) -> CheckoutResult<Option<Member>>;

    /// Book a completed order; returns the points earned, `None` for unknown members
    async fn award_points(&self, member_id: &str, order_total: Amount)
    -> CheckoutResult<Option<i64>>;

    /// Deduct `points`; returns the remaining balance, `None` for unknown
    /// members or a balance below `points`
    async fn use_points(&self, member_id: &str, points: i64) -> CheckoutResult<Option<i64>>;

    async fn upsert_member(&self, member: &Member) -> CheckoutResult<()>;
}

/// Stored admin settings document
#[trait_variant::make(SettingsRepository: Send)]
pub trait LocalSettingsRepository {
    /// Raw JSON of the security settings, if any were saved
    async fn load_security_config(&self) -> CheckoutResult<Option<String>>;

    async fn save_security_config(&self, raw: String) -> CheckoutResult<()>;
}

/// Payment processing boundary
#[trait_variant::make(PaymentGateway: Send)]
pub trait LocalPaymentGateway {
    async fn process(
        &self,
        method: PaymentMethod,
        order: &Order,
    ) -> CheckoutResult<PaymentConfirmation>;
}

/// What the remote sink said about a pushed order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkAck {
    /// Structured success reply
    Accepted(String),
    /// Reply was not JSON; the push may or may not have been recorded
    Ambiguous,
}

/// Remote sink failure; never fails a submission
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Order sink transport error: {0}")]
    Transport(String),
    #[error("Order sink answered with HTTP {0}")]
    Status(u16),
    #[error("Order sink rejected the order: {0}")]
    Rejected(String),
}

/// Best-effort remote copy of placed orders
#[trait_variant::make(OrderSink: Send)]
pub trait LocalOrderSink {
    async fn push(&self, order: &Order) -> Result<SinkAck, SinkError>;
}

/// Everything the checkout flow persists, behind one handle
pub trait CheckoutStore:
    OrderRepository
    + RateLimitRepository
    + CouponUsageRepository
    + DeviceFingerprintRepository
    + SecurityLogRepository
    + MemberDirectory
    + SettingsRepository
    + Send
    + Sync
    + 'static
{
}

impl<T> CheckoutStore for T where
    T: OrderRepository
        + RateLimitRepository
        + CouponUsageRepository
        + DeviceFingerprintRepository
        + SecurityLogRepository
        + MemberDirectory
        + SettingsRepository
        + Send
        + Sync
        + 'static
{
}
