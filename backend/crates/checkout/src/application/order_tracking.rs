//! Order Tracking Use Case
//!
//! Lookup by order number or contact data, and the status changes staff make
//! after an order was placed.

use std::sync::Arc;

use platform::clock::Clock;

use crate::domain::order::Order;
use crate::domain::repository::OrderRepository;
use crate::domain::value_objects::{OrderNumber, OrderStatus};
use crate::error::{CheckoutError, CheckoutResult};

pub struct OrderTrackingUseCase<R>
where
    R: OrderRepository,
{
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> OrderTrackingUseCase<R>
where
    R: OrderRepository,
{
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub async fn find(&self, order_number: &str) -> CheckoutResult<Order> {
        let number = parse_number(order_number)?;
        self.repo
            .find(&number)
            .await?
            .ok_or_else(|| CheckoutError::OrderNotFound(order_number.to_string()))
    }

    /// Orders placed with `phone` or `email`; empty values never match
    pub async fn find_by_contact(&self, phone: &str, email: &str) -> CheckoutResult<Vec<Order>> {
        let phone: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
        let email = email.trim();
        if phone.is_empty() && email.is_empty() {
            return Err(CheckoutError::validation(
                "Enter a phone number or an email address",
            ));
        }
        self.repo.find_by_contact(&phone, email).await
    }

    pub async fn update_status(
        &self,
        order_number: &str,
        status: OrderStatus,
        note: &str,
    ) -> CheckoutResult<Order> {
        let number = parse_number(order_number)?;
        let order = self
            .repo
            .update_status(&number, status, note, self.clock.now())
            .await?;
        tracing::info!(order_number = %number, status = %status, "Order status updated");
        Ok(order)
    }

    pub async fn set_tracking_number(
        &self,
        order_number: &str,
        tracking_number: &str,
    ) -> CheckoutResult<Order> {
        let number = parse_number(order_number)?;
        let tracking_number = tracking_number.trim();
        if tracking_number.is_empty() {
            return Err(CheckoutError::validation("Tracking number cannot be empty"));
        }
        let order = self
            .repo
            .set_tracking_number(&number, tracking_number)
            .await?;
        tracing::info!(order_number = %number, tracking_number = %tracking_number, "Tracking number set");
        Ok(order)
    }
}

fn parse_number(order_number: &str) -> CheckoutResult<OrderNumber> {
    OrderNumber::parse(order_number.trim())
        .ok_or_else(|| CheckoutError::OrderNotFound(order_number.to_string()))
}
