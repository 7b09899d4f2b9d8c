//! Submit Order Use Case
//!
//! Runs the submission pipeline for one checkout session:
//!
//! 1. verify the challenge
//! 2. check the device rate limit
//! 3. validate and sanitize the contact data
//! 4. re-validate the cart, the amount and the coupon
//! 5. assemble the order
//! 6. score it for fraud (high risk waits for confirmation)
//! 7. take payment
//! 8. persist locally, then push to the remote sink
//! 9. book the order against the rate limit, coupon and member account
//! 10. clear the cart
//!
//! Nothing is written before step 8. Failures after assembly are logged as
//! security events with the order number and leave the cart in place.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use platform::clock::Clock;

use crate::application::challenge::ChallengeVerifier;
use crate::application::config::{SecurityConfig, SecuritySettings};
use crate::application::coupon_engine::{CouponBook, CouponEngine};
use crate::application::rate_limiter::{RateLimitDecision, RateLimiter};
use crate::application::security_log::SecurityLog;
use crate::application::session::{CheckoutSession, SessionState};
use crate::domain::customer::CustomerInput;
use crate::domain::entities::SecurityActivity;
use crate::domain::order::{CouponDiscount, Discounts, MemberDiscount, NewOrder, Order, OrderLine};
use crate::domain::repository::{
    Catalog, CheckoutStore, MemberDirectory, OrderRepository, OrderSink, PaymentGateway, SinkAck,
};
use crate::domain::services::fraud::{self, FraudAssessment};
use crate::domain::services::{cart_rules, pricing};
use crate::domain::value_objects::{DeviceId, OrderNumber, PaymentMethod, RiskLevel};
use crate::error::{CheckoutError, CheckoutResult};

/// Attempts at drawing an unused order number
const ORDER_NUMBER_ATTEMPTS: usize = 5;

/// Who is submitting
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub device_id: DeviceId,
    pub user_agent: String,
}

/// Input DTO for submit order
#[derive(Debug, Clone, Default)]
pub struct SubmitOrderInput {
    pub customer: CustomerInput,
    /// Payment method code; cash on delivery when absent
    pub payment_method: Option<String>,
    pub coupon_code: Option<String>,
    pub challenge_answer: Option<i64>,
    /// Set when the customer confirmed a high-risk order
    pub acknowledge_risk: bool,
}

/// Output DTO for submit order
#[derive(Debug, Clone)]
pub struct SubmitOrderOutput {
    pub order: Order,
    pub fraud: FraudAssessment,
    /// Orders the device may still place in the current window
    pub remaining_orders: u32,
    pub points_earned: Option<i64>,
    /// Whether the remote sink confirmed the order
    pub remote_synced: bool,
}

/// Submit Order Use Case
pub struct SubmitOrderUseCase<S, G, K>
where
    S: CheckoutStore,
    G: PaymentGateway + Send + Sync,
    K: OrderSink + Send + Sync,
{
    store: Arc<S>,
    catalog: Arc<dyn Catalog>,
    gateway: Arc<G>,
    sink: Arc<K>,
    coupons: Arc<CouponBook>,
    clock: Arc<dyn Clock>,
}

/// Everything decided before the order exists
struct Priced {
    method: PaymentMethod,
    discounts: Discounts,
    remaining_orders: u32,
}

impl<S, G, K> SubmitOrderUseCase<S, G, K>
where
    S: CheckoutStore,
    G: PaymentGateway + Send + Sync,
    K: OrderSink + Send + Sync,
{
    pub fn new(
        store: Arc<S>,
        catalog: Arc<dyn Catalog>,
        gateway: Arc<G>,
        sink: Arc<K>,
        coupons: Arc<CouponBook>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            catalog,
            gateway,
            sink,
            coupons,
            clock,
        }
    }

    pub async fn execute(
        &self,
        session: &CheckoutSession,
        client: &ClientContext,
        input: SubmitOrderInput,
    ) -> CheckoutResult<SubmitOrderOutput> {
        let _guard = session.begin_submission()?;
        let mut state = session.state.lock().await;
        let config = SecuritySettings::new(self.store.clone()).current().await;

        let priced = self.precheck(&mut state, client, &input, &config).await?;
        let customer = input.customer.sanitize();

        let order_number = self.next_order_number().await?;
        let now = self.clock.now();
        let order = Order::assemble(NewOrder {
            order_number: order_number.clone(),
            created_at: now,
            device_id: client.device_id.clone(),
            customer,
            lines: order_lines(&state),
            discounts: priced.discounts,
            shipping_fee: config.shipping_fee,
            payment_method: priced.method,
        });

        let result = self.complete(order, client, &input, &config, now).await;

        match result {
            Ok((order, fraud)) => {
                let remote_synced = self.push_remote(&order).await;
                let points_earned = self.book_order(&order, &state, client).await;
                state.cart.clear();
                state.challenge = None;

                tracing::info!(
                    order_number = %order.order_number,
                    device_id = %client.device_id,
                    total = order.total,
                    method = %order.payment_method,
                    "Order placed"
                );

                Ok(SubmitOrderOutput {
                    order,
                    fraud,
                    remaining_orders: priced.remaining_orders.saturating_sub(1),
                    points_earned,
                    remote_synced,
                })
            }
            Err(e @ CheckoutError::ConfirmationRequired { .. }) => Err(e),
            Err(e) => {
                self.security_log()
                    .record(
                        &client.device_id,
                        &client.user_agent,
                        SecurityActivity::OrderSubmissionError {
                            order_number: Some(order_number.to_string()),
                            error: e.to_string(),
                        },
                    )
                    .await;
                Err(match e {
                    CheckoutError::Payment(_) => e,
                    other => CheckoutError::SubmissionFailed {
                        order_number: order_number.to_string(),
                        reason: other.to_string(),
                    },
                })
            }
        }
    }

    /// Steps 1 to 4; nothing is persisted except security events
    async fn precheck(
        &self,
        state: &mut SessionState,
        client: &ClientContext,
        input: &SubmitOrderInput,
        config: &SecurityConfig,
    ) -> CheckoutResult<Priced> {
        if config.captcha_enabled {
            let verifier = ChallengeVerifier::new(self.clock.clone());
            let verified = match input.challenge_answer {
                Some(answer) => verifier.verify(&mut state.challenge, answer),
                None if state.challenge.is_none() => Err(CheckoutError::ChallengeMissing),
                None => Err(CheckoutError::ChallengeIncorrect),
            };
            if let Err(e) = verified {
                self.security_log()
                    .record(
                        &client.device_id,
                        &client.user_agent,
                        SecurityActivity::ChallengeFailed {
                            reason: e.to_string(),
                        },
                    )
                    .await;
                return Err(e);
            }
        }

        let limiter = RateLimiter::new(self.store.clone(), self.clock.clone());
        let decision = limiter.check(&client.device_id, config).await?;
        if let RateLimitDecision::Blocked { message, .. } = &decision {
            self.security_log()
                .record(
                    &client.device_id,
                    &client.user_agent,
                    SecurityActivity::RateLimitExceeded {
                        message: message.clone(),
                    },
                )
                .await;
        }
        let remaining_orders = decision.into_result()?;

        let mut errors = input.customer.validate(config.strict_mode);
        let method = match input.payment_method.as_deref().map(str::trim) {
            None | Some("") => PaymentMethod::CashOnDelivery,
            Some(code) => code.parse::<PaymentMethod>().unwrap_or_else(|e| {
                errors.push(e);
                PaymentMethod::CashOnDelivery
            }),
        };
        if !errors.is_empty() {
            return Err(CheckoutError::Validation(errors));
        }

        let errors = cart_rules::validate_cart(&state.cart, &config.cart_rules(), self.catalog.as_ref());
        if !errors.is_empty() {
            return Err(CheckoutError::Validation(errors));
        }

        let subtotal = state.cart.subtotal();
        cart_rules::validate_order_amount(subtotal, config.min_amount, config.max_amount)
            .map_err(CheckoutError::validation)?;

        let mut discounts = Discounts::default();

        if let Some(code) = input.coupon_code.as_deref().filter(|c| !c.trim().is_empty()) {
            let engine = CouponEngine::new(self.store.clone(), self.coupons.clone(), self.clock.clone());
            let applied = engine
                .validate(code, subtotal, &client.device_id)
                .await?
                .map_err(|rejection| CheckoutError::validation(rejection.to_string()))?;
            discounts.coupon = Some(CouponDiscount {
                code: applied.coupon.code,
                amount: applied.discount,
            });
        }

        if let Some(member_id) = state.member_id.as_deref() {
            match self.store.member(member_id).await? {
                Some(member) => {
                    let tier = member.tier();
                    let amount = pricing::member_discount(tier, subtotal);
                    if amount > 0 {
                        discounts.member = Some(MemberDiscount {
                            member_id: member.id,
                            tier,
                            amount,
                        });
                    }
                }
                None => {
                    tracing::warn!(member_id = %member_id, "Session member not found");
                }
            }
        }

        Ok(Priced {
            method,
            discounts,
            remaining_orders,
        })
    }

    /// Steps 6 to 8, up to local persistence
    async fn complete(
        &self,
        mut order: Order,
        client: &ClientContext,
        input: &SubmitOrderInput,
        config: &SecurityConfig,
        now: DateTime<Utc>,
    ) -> CheckoutResult<(Order, FraudAssessment)> {
        let recent = self
            .store
            .recent_for_device(&client.device_id, now - config.fraud_lookback())
            .await?;
        let assessment = fraud::assess(&order, &recent, &config.fraud_rules());

        if !assessment.flags.is_empty() {
            self.security_log()
                .record(
                    &client.device_id,
                    &client.user_agent,
                    SecurityActivity::SuspiciousOrder {
                        order_number: order.order_number.to_string(),
                        flags: assessment.flags.clone(),
                        risk_level: assessment.risk_level,
                    },
                )
                .await;
        }

        if assessment.risk_level == RiskLevel::High && !input.acknowledge_risk {
            return Err(CheckoutError::ConfirmationRequired {
                flags: assessment.flags,
            });
        }

        let confirmation = self.gateway.process(order.payment_method, &order).await?;
        order.payment = Some(confirmation);

        self.store
            .append(&order)
            .await
            .map_err(|e| CheckoutError::Persistence(e.to_string()))?;

        Ok((order, assessment))
    }

    /// Step 9; failures here are logged, the order already exists
    async fn book_order(
        &self,
        order: &Order,
        state: &SessionState,
        client: &ClientContext,
    ) -> Option<i64> {
        let limiter = RateLimiter::new(self.store.clone(), self.clock.clone());
        if let Err(e) = limiter.record(&client.device_id).await {
            tracing::error!(error = %e, order_number = %order.order_number, "Failed to record order for rate limiting");
        }

        if let Some(coupon) = &order.discounts.coupon {
            let engine = CouponEngine::new(self.store.clone(), self.coupons.clone(), self.clock.clone());
            if let Err(e) = engine.mark_used(&client.device_id, &coupon.code).await {
                tracing::error!(error = %e, code = %coupon.code, "Failed to mark coupon as used");
            }
        }

        let member_id = state.member_id.as_deref()?;
        match self.store.award_points(member_id, order.total).await {
            Ok(points) => points,
            Err(e) => {
                tracing::error!(error = %e, member_id = %member_id, "Failed to award member points");
                None
            }
        }
    }

    /// Best-effort remote copy; never fails the submission
    async fn push_remote(&self, order: &Order) -> bool {
        match self.sink.push(order).await {
            Ok(SinkAck::Accepted(message)) => {
                tracing::info!(order_number = %order.order_number, message = %message, "Order pushed to remote sink");
                true
            }
            Ok(SinkAck::Ambiguous) => {
                tracing::info!(order_number = %order.order_number, "Remote sink reply was not JSON, assuming success");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, order_number = %order.order_number, "Remote order push failed");
                false
            }
        }
    }

    async fn next_order_number(&self) -> CheckoutResult<OrderNumber> {
        for _ in 0..ORDER_NUMBER_ATTEMPTS {
            let candidate = OrderNumber::generate(self.clock.now());
            if !self.store.exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(CheckoutError::Internal(
            "Could not allocate an order number".to_string(),
        ))
    }

    fn security_log(&self) -> SecurityLog<S> {
        SecurityLog::new(self.store.clone(), self.clock.clone())
    }
}

fn order_lines(state: &SessionState) -> Vec<OrderLine> {
    state
        .cart
        .lines()
        .iter()
        .map(|line| OrderLine {
            product_id: line.product_id.clone(),
            size: line.size.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            subtotal: line.subtotal(),
        })
        .collect()
}
