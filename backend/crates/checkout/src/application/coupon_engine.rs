//! Coupon & Discount Engine
//!
//! Coupon codes are case-insensitive and single-use per device. Members can
//! also buy fixed-amount coupons with points; those are granted to the device
//! and spent on use. The discount arithmetic itself lives in
//! [`crate::domain::services::pricing`].

use std::sync::Arc;

use chrono::{NaiveDate, TimeDelta};
use platform::clock::Clock;
use serde::Serialize;

use crate::domain::entities::Coupon;
use crate::domain::repository::{CouponUsageRepository, MemberDirectory};
use crate::domain::services::pricing;
use crate::domain::value_objects::{Amount, CouponKind, DeviceId};
use crate::error::CheckoutResult;

/// Days an exchanged coupon stays valid
pub const EXCHANGED_COUPON_DAYS: i64 = 30;

/// Fixed-amount coupon members can buy with points
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsOffer {
    pub code: String,
    pub value: Amount,
    pub min_order_amount: Amount,
    pub points_cost: i64,
    pub description: String,
}

impl PointsOffer {
    fn coupon(&self, expiry: NaiveDate) -> Coupon {
        Coupon {
            code: self.code.clone(),
            kind: CouponKind::Fixed,
            value: self.value,
            min_order_amount: self.min_order_amount,
            max_discount: self.value,
            expiry,
            description: self.description.clone(),
        }
    }
}

/// Known coupons and points offers
#[derive(Debug, Clone)]
pub struct CouponBook {
    coupons: Vec<Coupon>,
    offers: Vec<PointsOffer>,
}

impl CouponBook {
    pub fn new(coupons: Vec<Coupon>) -> Self {
        Self {
            coupons,
            offers: Vec::new(),
        }
    }

    pub fn with_offers(mut self, offers: Vec<PointsOffer>) -> Self {
        self.offers = offers;
        self
    }

    /// The storefront's standing promotions
    pub fn builtin() -> Self {
        let expiry = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap_or(NaiveDate::MAX);
        let coupon = |code: &str, kind, value, min_order_amount, max_discount, description: &str| {
            Coupon {
                code: code.to_string(),
                kind,
                value,
                min_order_amount,
                max_discount,
                expiry,
                description: description.to_string(),
            }
        };
        Self::new(vec![
            coupon(
                "WELCOME100",
                CouponKind::Fixed,
                100,
                500,
                100,
                "NT$100 off orders of NT$500 or more",
            ),
            coupon(
                "COFFEE20",
                CouponKind::Percentage,
                20,
                1000,
                500,
                "20% off orders of NT$1000 or more, up to NT$500",
            ),
            coupon(
                "FREESHIP",
                CouponKind::FreeShipping,
                60,
                800,
                60,
                "Free shipping on orders of NT$800 or more",
            ),
            coupon(
                "VIP15",
                CouponKind::Percentage,
                15,
                1500,
                1000,
                "15% off orders of NT$1500 or more, up to NT$1000",
            ),
        ])
        .with_offers(vec![
            offer(50, 500, "NT$50 off orders of NT$500 or more"),
            offer(100, 800, "NT$100 off orders of NT$800 or more"),
            offer(200, 1500, "NT$200 off orders of NT$1500 or more"),
        ])
    }

    pub fn find(&self, code: &str) -> Option<&Coupon> {
        let code = normalize(code);
        self.coupons.iter().find(|c| c.code == code)
    }

    pub fn all(&self) -> &[Coupon] {
        &self.coupons
    }

    pub fn offer(&self, code: &str) -> Option<&PointsOffer> {
        let code = normalize(code);
        self.offers.iter().find(|o| o.code == code)
    }

    pub fn offers(&self) -> &[PointsOffer] {
        &self.offers
    }
}

/// Offer costing one point per NT$ off
fn offer(value: Amount, min_order_amount: Amount, description: &str) -> PointsOffer {
    PointsOffer {
        code: format!("POINTS{value}"),
        value,
        min_order_amount,
        points_cost: value,
        description: description.to_string(),
    }
}

impl Default for CouponBook {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Why a coupon cannot be applied
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CouponRejection {
    #[error("Coupon code {0} does not exist")]
    Unknown(String),

    #[error("Coupon {0} has expired")]
    Expired(String),

    #[error("Coupon {code} requires an order of at least NT$ {min_order_amount}")]
    BelowMinimum {
        code: String,
        min_order_amount: Amount,
    },

    #[error("Coupon {0} has already been used")]
    AlreadyUsed(String),
}

/// Why points could not be exchanged for a coupon
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeRejection {
    #[error("Only members can exchange points")]
    NotAMember,

    #[error("Points offer {0} does not exist")]
    UnknownOffer(String),

    #[error("Not enough points: {required} needed, {available} available")]
    InsufficientPoints { required: i64, available: i64 },
}

/// Coupon bought with points
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsExchange {
    pub coupon: Coupon,
    pub remaining_points: i64,
}

/// A coupon accepted for a given order amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCoupon {
    pub coupon: Coupon,
    pub discount: Amount,
}

pub struct CouponEngine<R>
where
    R: CouponUsageRepository,
{
    repo: Arc<R>,
    book: Arc<CouponBook>,
    clock: Arc<dyn Clock>,
}

impl<R> CouponEngine<R>
where
    R: CouponUsageRepository,
{
    pub fn new(repo: Arc<R>, book: Arc<CouponBook>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, book, clock }
    }

    /// Check `code` for `device_id` against `order_amount`
    ///
    /// The outer result carries storage failures, the inner one the
    /// customer-facing rejection.
    pub async fn validate(
        &self,
        code: &str,
        order_amount: Amount,
        device_id: &DeviceId,
    ) -> CheckoutResult<Result<AppliedCoupon, CouponRejection>> {
        let normalized = normalize(code);
        let now = self.clock.now();
        let (coupon, granted) = match self.book.find(&normalized) {
            Some(coupon) => (coupon.clone(), false),
            None => {
                let mut granted: Vec<Coupon> = self
                    .repo
                    .granted_coupons(device_id)
                    .await?
                    .into_iter()
                    .filter(|c| c.code == normalized)
                    .collect();
                // Prefer a usable grant, oldest expiry first
                granted.sort_by_key(|c| (c.is_expired(now), c.expiry));
                match granted.into_iter().next() {
                    Some(coupon) => (coupon, true),
                    None => return Ok(Err(CouponRejection::Unknown(normalized))),
                }
            }
        };

        if coupon.is_expired(now) {
            return Ok(Err(CouponRejection::Expired(coupon.code)));
        }

        if order_amount < coupon.min_order_amount {
            return Ok(Err(CouponRejection::BelowMinimum {
                code: coupon.code,
                min_order_amount: coupon.min_order_amount,
            }));
        }

        if !granted && self.repo.used_codes(device_id).await?.contains(&coupon.code) {
            return Ok(Err(CouponRejection::AlreadyUsed(coupon.code)));
        }

        Ok(Ok(AppliedCoupon {
            discount: pricing::coupon_discount(&coupon, order_amount),
            coupon,
        }))
    }

    /// Coupons `device_id` can still use; an `order_amount` of 0 skips the minimum check
    pub async fn available(
        &self,
        device_id: &DeviceId,
        order_amount: Amount,
    ) -> CheckoutResult<Vec<Coupon>> {
        let now = self.clock.now();
        let used = self.repo.used_codes(device_id).await?;
        let granted = self.repo.granted_coupons(device_id).await?;
        Ok(self
            .book
            .all()
            .iter()
            .filter(|c| !used.contains(&c.code))
            .chain(granted.iter())
            .filter(|c| !c.is_expired(now))
            .filter(|c| order_amount == 0 || order_amount >= c.min_order_amount)
            .cloned()
            .collect())
    }

    /// Record a redemption; a granted coupon is spent, a standing one is
    /// marked used for the device
    pub async fn mark_used(&self, device_id: &DeviceId, code: &str) -> CheckoutResult<()> {
        let code = normalize(code);
        if self.repo.consume_granted(device_id, &code).await? {
            return Ok(());
        }
        self.repo.mark_used(device_id, &code).await
    }
}

impl<R> CouponEngine<R>
where
    R: CouponUsageRepository + MemberDirectory,
{
    /// Buy the coupon `offer_code` with `member_id`'s points and grant it to
    /// `device_id`, valid for [`EXCHANGED_COUPON_DAYS`]
    pub async fn exchange_points(
        &self,
        member_id: &str,
        offer_code: &str,
        device_id: &DeviceId,
    ) -> CheckoutResult<Result<PointsExchange, ExchangeRejection>> {
        let Some(member) = self.repo.member(member_id).await? else {
            return Ok(Err(ExchangeRejection::NotAMember));
        };
        let Some(offer) = self.book.offer(offer_code) else {
            return Ok(Err(ExchangeRejection::UnknownOffer(normalize(offer_code))));
        };
        if member.points < offer.points_cost {
            return Ok(Err(ExchangeRejection::InsufficientPoints {
                required: offer.points_cost,
                available: member.points,
            }));
        }

        let expiry = (self.clock.now() + TimeDelta::days(EXCHANGED_COUPON_DAYS)).date_naive();
        let coupon = offer.coupon(expiry);
        self.repo.grant_coupon(device_id, &coupon).await?;

        // Balance re-checked under the store lock; revoke the grant if a
        // concurrent exchange spent the points first
        let Some(remaining_points) = self.repo.use_points(member_id, offer.points_cost).await?
        else {
            self.repo.consume_granted(device_id, &coupon.code).await?;
            let available = self
                .repo
                .member(member_id)
                .await?
                .map_or(0, |m| m.points);
            return Ok(Err(ExchangeRejection::InsufficientPoints {
                required: offer.points_cost,
                available,
            }));
        };

        tracing::info!(
            member_id = %member_id,
            code = %coupon.code,
            points = offer.points_cost,
            remaining_points,
            "Points exchanged for coupon"
        );
        Ok(Ok(PointsExchange {
            coupon,
            remaining_points,
        }))
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}
