//! Fraud heuristic
//!
//! Scores one assembled order against the device's recent orders. The result
//! is advisory: the pipeline asks for confirmation on high risk instead of
//! rejecting.

use serde::Serialize;

use crate::domain::order::Order;
use crate::domain::value_objects::{Amount, RiskLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FraudRules {
    /// A single line at or above this quantity is flagged
    pub large_quantity_threshold: i64,
    /// Order totals strictly above this are flagged
    pub high_value_threshold: Amount,
    /// Recent orders from the same device at or above this count are flagged
    pub suspicious_order_threshold: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudAssessment {
    pub is_suspicious: bool,
    pub flags: Vec<String>,
    pub risk_level: RiskLevel,
}

/// Evaluate `order` against `recent`, the same device's orders inside the lookback
pub fn assess(order: &Order, recent: &[Order], rules: &FraudRules) -> FraudAssessment {
    let mut flags = Vec::new();

    for line in &order.lines {
        if line.quantity >= rules.large_quantity_threshold {
            flags.push(format!(
                "Large quantity of a single item: {} ({}) x {}",
                line.product_id, line.size, line.quantity
            ));
        }
    }

    if order.total > rules.high_value_threshold {
        flags.push(format!("High order total: NT$ {}", order.total));
    }

    if recent.len() >= rules.suspicious_order_threshold {
        flags.push(format!(
            "Many orders from this device in the last 24 hours: {}",
            recent.len()
        ));
    }

    let similar = recent
        .iter()
        .filter(|o| o.matches_contact(&order.customer.phone, &order.customer.email))
        .count();
    if similar > 0 {
        flags.push(format!("Recent orders with the same contact details: {similar}"));
    }

    FraudAssessment {
        is_suspicious: flags.len() >= 2,
        risk_level: RiskLevel::from_flag_count(flags.len()),
        flags,
    }
}
