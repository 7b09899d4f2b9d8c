//! HTTP Handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use platform::clock::Clock;
use platform::fingerprint::{DeviceSignals, ReportedSignals};

use crate::application::challenge::ChallengeVerifier;
use crate::application::config::{CheckoutConfig, SecuritySettings};
use crate::application::coupon_engine::{CouponBook, CouponEngine, PointsExchange};
use crate::application::device_identity::DeviceIdentity;
use crate::application::order_tracking::OrderTrackingUseCase;
use crate::application::session::{CheckoutSession, SessionRegistry, parse_member_token};
use crate::application::submit_order::{ClientContext, SubmitOrderInput, SubmitOrderUseCase};
use crate::domain::cart::Cart;
use crate::domain::order::Order;
use crate::domain::repository::{Catalog, CheckoutStore, OrderSink, PaymentGateway};
use crate::error::{CheckoutError, CheckoutResult};
use crate::presentation::dto::{
    CartRequest, CartResponse, ChallengeResponse, CouponListResponse, CouponRequest,
    CouponResponse, PointsExchangeRequest, SubmitRequest, SubmitResponse,
};
use crate::presentation::middleware::SessionLayerState;

/// Shared state for checkout handlers
pub struct CheckoutAppState<S, G, K>
where
    S: CheckoutStore,
    G: PaymentGateway + Send + Sync + 'static,
    K: OrderSink + Send + Sync + 'static,
{
    pub store: Arc<S>,
    pub gateway: Arc<G>,
    pub sink: Arc<K>,
    pub catalog: Arc<dyn Catalog>,
    pub coupons: Arc<CouponBook>,
    pub sessions: Arc<SessionRegistry>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<CheckoutConfig>,
}

impl<S, G, K> Clone for CheckoutAppState<S, G, K>
where
    S: CheckoutStore,
    G: PaymentGateway + Send + Sync + 'static,
    K: OrderSink + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gateway: self.gateway.clone(),
            sink: self.sink.clone(),
            catalog: self.catalog.clone(),
            coupons: self.coupons.clone(),
            sessions: self.sessions.clone(),
            clock: self.clock.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S, G, K> CheckoutAppState<S, G, K>
where
    S: CheckoutStore,
    G: PaymentGateway + Send + Sync + 'static,
    K: OrderSink + Send + Sync + 'static,
{
    pub fn session_layer(&self) -> SessionLayerState {
        SessionLayerState {
            sessions: self.sessions.clone(),
            config: self.config.clone(),
        }
    }

    /// Drop idle sessions and the device tokens stored for them
    pub async fn purge_expired_sessions(&self) -> usize {
        DeviceIdentity::new(self.store.clone())
            .purge_expired(&self.sessions)
            .await
    }

    /// Device token for the session's browser profile
    async fn client(
        &self,
        session: &CheckoutSession,
        headers: &HeaderMap,
        reported: &ReportedSignals,
    ) -> ClientContext {
        let signals = DeviceSignals::collect(headers, reported);
        let device_id = DeviceIdentity::new(self.store.clone())
            .resolve(&session.id().to_string(), &signals)
            .await;
        ClientContext {
            device_id,
            user_agent: signals.user_agent,
        }
    }
}

/// GET /api/checkout/challenge
pub async fn issue_challenge<S, G, K>(
    State(state): State<CheckoutAppState<S, G, K>>,
    Extension(session): Extension<Arc<CheckoutSession>>,
) -> CheckoutResult<Json<ChallengeResponse>>
where
    S: CheckoutStore,
    G: PaymentGateway + Send + Sync + 'static,
    K: OrderSink + Send + Sync + 'static,
{
    let config = SecuritySettings::new(state.store.clone()).current().await;
    if !config.captcha_enabled {
        return Ok(Json(ChallengeResponse {
            enabled: false,
            question: None,
            expires_at: None,
        }));
    }

    let verifier = ChallengeVerifier::new(state.clock.clone());
    let mut session_state = session.state.lock().await;
    let issued = verifier.issue(&mut session_state.challenge, config.captcha_range);

    Ok(Json(ChallengeResponse {
        enabled: true,
        question: Some(issued.question),
        expires_at: Some(issued.expires_at),
    }))
}

/// PUT /api/checkout/cart
///
/// The member is taken from `memberToken`, which the member service signs
/// with the shared member secret after sign-in. A raw member id from the
/// browser is never trusted; unsigned or forged references are refused.
pub async fn replace_cart<S, G, K>(
    State(state): State<CheckoutAppState<S, G, K>>,
    Extension(session): Extension<Arc<CheckoutSession>>,
    Json(req): Json<CartRequest>,
) -> CheckoutResult<Json<CartResponse>>
where
    S: CheckoutStore,
    G: PaymentGateway + Send + Sync + 'static,
    K: OrderSink + Send + Sync + 'static,
{
    let config = SecuritySettings::new(state.store.clone()).current().await;
    let limits = config.cart_limits();

    let mut cart = Cart::new();
    for line in req.lines {
        cart.add(
            &line.product_id,
            &line.size,
            line.unit_price,
            line.quantity,
            &limits,
        )?;
    }

    let member_id = match req.member_token.as_deref().map(str::trim) {
        None => None,
        Some("") => Some(None),
        Some(token) => Some(Some(parse_member_token(
            token,
            &state.config.member_secret,
        )?)),
    };

    let mut session_state = session.state.lock().await;
    session_state.cart = cart;
    if let Some(member_id) = member_id {
        session_state.member_id = member_id;
    }

    Ok(Json(CartResponse {
        lines: session_state.cart.lines().to_vec(),
        subtotal: session_state.cart.subtotal(),
        total_quantity: session_state.cart.total_quantity(),
    }))
}

/// POST /api/checkout/coupon
pub async fn check_coupon<S, G, K>(
    State(state): State<CheckoutAppState<S, G, K>>,
    Extension(session): Extension<Arc<CheckoutSession>>,
    headers: HeaderMap,
    Json(req): Json<CouponRequest>,
) -> CheckoutResult<Json<CouponResponse>>
where
    S: CheckoutStore,
    G: PaymentGateway + Send + Sync + 'static,
    K: OrderSink + Send + Sync + 'static,
{
    let client = state.client(&session, &headers, &req.device).await;
    let subtotal = session.state.lock().await.cart.subtotal();

    let engine = CouponEngine::new(
        state.store.clone(),
        state.coupons.clone(),
        state.clock.clone(),
    );
    let response = match engine.validate(&req.code, subtotal, &client.device_id).await? {
        Ok(applied) => CouponResponse {
            valid: true,
            code: applied.coupon.code,
            discount: Some(applied.discount),
            description: Some(applied.coupon.description),
            message: None,
        },
        Err(rejection) => CouponResponse {
            valid: false,
            code: req.code.trim().to_uppercase(),
            discount: None,
            description: None,
            message: Some(rejection.to_string()),
        },
    };

    Ok(Json(response))
}

/// GET /api/checkout/coupons
pub async fn list_coupons<S, G, K>(
    State(state): State<CheckoutAppState<S, G, K>>,
    Extension(session): Extension<Arc<CheckoutSession>>,
    headers: HeaderMap,
) -> CheckoutResult<Json<CouponListResponse>>
where
    S: CheckoutStore,
    G: PaymentGateway + Send + Sync + 'static,
    K: OrderSink + Send + Sync + 'static,
{
    let client = state
        .client(&session, &headers, &ReportedSignals::default())
        .await;
    let subtotal = session.state.lock().await.cart.subtotal();

    let engine = CouponEngine::new(
        state.store.clone(),
        state.coupons.clone(),
        state.clock.clone(),
    );
    Ok(Json(CouponListResponse {
        coupons: engine.available(&client.device_id, subtotal).await?,
        points_offers: state.coupons.offers().to_vec(),
    }))
}

/// POST /api/checkout/points/exchange
pub async fn exchange_points<S, G, K>(
    State(state): State<CheckoutAppState<S, G, K>>,
    Extension(session): Extension<Arc<CheckoutSession>>,
    headers: HeaderMap,
    Json(req): Json<PointsExchangeRequest>,
) -> CheckoutResult<Json<PointsExchange>>
where
    S: CheckoutStore,
    G: PaymentGateway + Send + Sync + 'static,
    K: OrderSink + Send + Sync + 'static,
{
    let client = state.client(&session, &headers, &req.device).await;
    let Some(member_id) = session.state.lock().await.member_id.clone() else {
        return Err(CheckoutError::validation("Only members can exchange points"));
    };

    let engine = CouponEngine::new(
        state.store.clone(),
        state.coupons.clone(),
        state.clock.clone(),
    );
    engine
        .exchange_points(&member_id, &req.code, &client.device_id)
        .await?
        .map(Json)
        .map_err(|rejection| CheckoutError::validation(rejection.to_string()))
}

/// POST /api/checkout/submit
pub async fn submit_order<S, G, K>(
    State(state): State<CheckoutAppState<S, G, K>>,
    Extension(session): Extension<Arc<CheckoutSession>>,
    headers: HeaderMap,
    Json(req): Json<SubmitRequest>,
) -> CheckoutResult<impl IntoResponse>
where
    S: CheckoutStore,
    G: PaymentGateway + Send + Sync + 'static,
    K: OrderSink + Send + Sync + 'static,
{
    let client = state.client(&session, &headers, &req.device).await;

    let use_case = SubmitOrderUseCase::new(
        state.store.clone(),
        state.catalog.clone(),
        state.gateway.clone(),
        state.sink.clone(),
        state.coupons.clone(),
        state.clock.clone(),
    );

    let input = SubmitOrderInput {
        customer: req.customer,
        payment_method: req.payment_method,
        coupon_code: req.coupon_code,
        challenge_answer: req.captcha_answer,
        acknowledge_risk: req.acknowledge_risk,
    };

    let output = use_case.execute(&session, &client, input).await?;
    let location = format!("/api/checkout/orders/{}", output.order.order_number);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(SubmitResponse {
            risk_level: output.fraud.risk_level,
            remaining_orders: output.remaining_orders,
            points_earned: output.points_earned,
            order: output.order,
        }),
    ))
}

/// GET /api/checkout/orders/{order_number}
pub async fn get_order<S, G, K>(
    State(state): State<CheckoutAppState<S, G, K>>,
    Path(order_number): Path<String>,
) -> CheckoutResult<Json<Order>>
where
    S: CheckoutStore,
    G: PaymentGateway + Send + Sync + 'static,
    K: OrderSink + Send + Sync + 'static,
{
    let use_case = OrderTrackingUseCase::new(state.store.clone(), state.clock.clone());
    Ok(Json(use_case.find(&order_number).await?))
}
