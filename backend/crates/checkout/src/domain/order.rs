//! Order aggregate
//!
//! An order is assembled once by the submission pipeline. Afterwards only the
//! status (with its append-only history) and the tracking number change.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::customer::Customer;
use crate::domain::services::pricing;
use crate::domain::value_objects::{
    Amount, DeviceId, MemberTier, OrderNumber, OrderStatus, PaymentMethod,
};
use crate::error::{CheckoutError, CheckoutResult};

/// Days between order creation and the estimated delivery date
pub const DELIVERY_ESTIMATE_DAYS: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: String,
    pub size: String,
    pub quantity: i64,
    pub unit_price: Amount,
    pub subtotal: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponDiscount {
    pub code: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDiscount {
    pub member_id: String,
    pub tier: MemberTier,
    pub amount: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discounts {
    pub coupon: Option<CouponDiscount>,
    pub member: Option<MemberDiscount>,
}

impl Discounts {
    pub fn total(&self) -> Amount {
        self.coupon.as_ref().map_or(0, |c| c.amount) + self.member.as_ref().map_or(0, |m| m.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub status: OrderStatus,
    pub at: DateTime<Utc>,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    pub bank_name: String,
    pub branch: String,
    pub account_number: String,
    pub account_name: String,
}

/// Method-specific payment outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PaymentDetails {
    #[serde(rename_all = "camelCase")]
    CashOnDelivery { note: String },
    #[serde(rename_all = "camelCase")]
    BankTransfer {
        transfer_code: String,
        bank: BankAccount,
        due_date: NaiveDate,
    },
    #[serde(rename_all = "camelCase")]
    Atm {
        virtual_account: String,
        due_date: NaiveDate,
    },
    #[serde(rename_all = "camelCase")]
    Online {
        transaction_id: String,
        paid: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    pub method: PaymentMethod,
    pub fee: Amount,
    pub details: PaymentDetails,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_number: OrderNumber,
    pub created_at: DateTime<Utc>,
    pub device_id: DeviceId,
    pub customer: Customer,
    pub lines: Vec<OrderLine>,
    pub subtotal: Amount,
    pub discounts: Discounts,
    pub shipping_fee: Amount,
    pub total: Amount,
    pub payment_method: PaymentMethod,
    pub payment: Option<PaymentConfirmation>,
    pub status: OrderStatus,
    pub status_history: Vec<StatusEntry>,
    pub estimated_delivery: DateTime<Utc>,
    pub tracking_number: Option<String>,
}

/// Everything needed to assemble an order
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub created_at: DateTime<Utc>,
    pub device_id: DeviceId,
    pub customer: Customer,
    pub lines: Vec<OrderLine>,
    pub discounts: Discounts,
    pub shipping_fee: Amount,
    pub payment_method: PaymentMethod,
}

impl Order {
    /// Assemble a pending order; totals are derived from the lines
    pub fn assemble(new: NewOrder) -> Self {
        let subtotal = new
            .lines
            .iter()
            .fold(0, |total: Amount, l| total.saturating_add(l.subtotal));
        let total = pricing::order_total(subtotal, new.shipping_fee, new.discounts.total());
        Self {
            order_number: new.order_number,
            created_at: new.created_at,
            device_id: new.device_id,
            customer: new.customer,
            lines: new.lines,
            subtotal,
            discounts: new.discounts,
            shipping_fee: new.shipping_fee,
            total,
            payment_method: new.payment_method,
            payment: None,
            status: OrderStatus::Pending,
            status_history: vec![StatusEntry {
                status: OrderStatus::Pending,
                at: new.created_at,
                note: "Order created".to_string(),
            }],
            estimated_delivery: new.created_at + TimeDelta::days(DELIVERY_ESTIMATE_DAYS),
            tracking_number: None,
        }
    }

    /// Move to `next`, appending a history entry
    pub fn transition(
        &mut self,
        next: OrderStatus,
        note: impl Into<String>,
        at: DateTime<Utc>,
    ) -> CheckoutResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(CheckoutError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.status_history.push(StatusEntry {
            status: next,
            at,
            note: note.into(),
        });
        Ok(())
    }

    pub fn matches_contact(&self, phone: &str, email: &str) -> bool {
        (!phone.is_empty() && self.customer.phone == phone)
            || (!email.is_empty() && self.customer.email == email)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn customer() -> Customer {
        Customer {
            name: "王小明".to_string(),
            phone: "0912345678".to_string(),
            email: "ming@example.com".to_string(),
            address: "台北市信義區松高路 1 號".to_string(),
            note: String::new(),
        }
    }

    pub fn line(product_id: &str, size: &str, unit_price: Amount, quantity: i64) -> OrderLine {
        OrderLine {
            product_id: product_id.to_string(),
            size: size.to_string(),
            quantity,
            unit_price,
            subtotal: unit_price * quantity,
        }
    }

    pub fn order(number: &str, device: &str, at: DateTime<Utc>, lines: Vec<OrderLine>) -> Order {
        Order::assemble(NewOrder {
            order_number: OrderNumber::parse(number).expect("valid order number"),
            created_at: at,
            device_id: DeviceId::new(device),
            customer: customer(),
            lines,
            discounts: Discounts::default(),
            shipping_fee: 60,
            payment_method: PaymentMethod::CashOnDelivery,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_assemble_pending_order() {
        let at = Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap();
        let order = order("ORD202602010001", "dev", at, vec![line("A", "120g", 350, 2)]);

        assert_eq!(order.subtotal, 700);
        assert_eq!(order.total, 760);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.status_history.len(), 1);
        assert_eq!(order.estimated_delivery, at + TimeDelta::days(3));
        assert!(order.tracking_number.is_none());
    }

    #[test]
    fn test_transition_appends_history() {
        let at = Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap();
        let mut order = order("ORD202602010002", "dev", at, vec![line("A", "120g", 350, 1)]);

        order
            .transition(OrderStatus::Confirmed, "Payment checked", at)
            .unwrap();
        assert_eq!(order.status_history.len(), 2);

        let err = order
            .transition(OrderStatus::Delivered, "skip", at)
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidTransition { .. }));
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.status_history.len(), 2);
    }

    #[test]
    fn test_matches_contact_ignores_empty_email() {
        let at = Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap();
        let mut order = order("ORD202602010003", "dev", at, vec![line("A", "120g", 350, 1)]);
        order.customer.email = String::new();
        assert!(!order.matches_contact("0900000000", ""));
        assert!(order.matches_contact("0912345678", ""));
    }
}
