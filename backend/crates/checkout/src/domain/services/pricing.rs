//! Discount arithmetic
//!
//! Coupon and member discounts are computed independently, each clamped by
//! its own cap, and stack additively. There is no combined cap.

use crate::domain::entities::Coupon;
use crate::domain::value_objects::{Amount, CouponKind, MemberTier};

/// Discount a coupon grants on `order_amount`, clamped to the coupon's cap
pub fn coupon_discount(coupon: &Coupon, order_amount: Amount) -> Amount {
    let raw = match coupon.kind {
        CouponKind::Percentage => order_amount.max(0).saturating_mul(coupon.value) / 100,
        CouponKind::Fixed | CouponKind::FreeShipping => coupon.value,
    };
    raw.clamp(0, coupon.max_discount)
}

/// Tier discount on the subtotal, rounded down
pub fn member_discount(tier: MemberTier, subtotal: Amount) -> Amount {
    subtotal.max(0).saturating_mul(tier.discount_percent()) / 100
}

/// `subtotal + shipping − discounts`, never below zero
pub fn order_total(subtotal: Amount, shipping_fee: Amount, discounts: Amount) -> Amount {
    subtotal
        .saturating_add(shipping_fee)
        .saturating_sub(discounts)
        .max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn coupon(kind: CouponKind, value: Amount, max_discount: Amount) -> Coupon {
        Coupon {
            code: "T".to_string(),
            kind,
            value,
            min_order_amount: 0,
            max_discount,
            expiry: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            description: String::new(),
        }
    }

    #[test]
    fn test_percentage_floors_and_caps() {
        let c = coupon(CouponKind::Percentage, 20, 500);
        assert_eq!(coupon_discount(&c, 1_000), 200);
        assert_eq!(coupon_discount(&c, 1_999), 399);
        assert_eq!(coupon_discount(&c, 10_000), 500);
    }

    #[test]
    fn test_fixed_and_shipping_are_capped() {
        assert_eq!(coupon_discount(&coupon(CouponKind::Fixed, 100, 100), 500), 100);
        assert_eq!(coupon_discount(&coupon(CouponKind::Fixed, 150, 100), 500), 100);
        assert_eq!(coupon_discount(&coupon(CouponKind::FreeShipping, 60, 60), 900), 60);
    }

    #[test]
    fn test_member_discount_by_tier() {
        assert_eq!(member_discount(MemberTier::Silver, 1_000), 50);
        assert_eq!(member_discount(MemberTier::Gold, 999), 99);
        assert_eq!(member_discount(MemberTier::Bronze, 1_000), 0);
    }

    #[test]
    fn test_member_and_coupon_stack() {
        // subtotal 1000, silver member, COFFEE20
        let member = member_discount(MemberTier::Silver, 1_000);
        let coupon = coupon_discount(&coupon(CouponKind::Percentage, 20, 500), 1_000);
        assert_eq!((member, coupon), (50, 200));
        assert_eq!(order_total(1_000, 60, member + coupon), 1_000 + 60 - 250);
    }
}
