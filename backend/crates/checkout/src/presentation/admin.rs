//! Admin Handlers
//!
//! Staff-only operations, mounted under `/admin` behind [`require_admin`]
//! when an admin token is configured.
//!
//! [`require_admin`]: crate::presentation::middleware::require_admin

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use crate::application::config::{SecurityConfig, SecuritySettings};
use crate::application::order_tracking::OrderTrackingUseCase;
use crate::application::security_log::SecurityLog;
use crate::domain::entities::SecurityEvent;
use crate::domain::order::Order;
use crate::domain::repository::{CheckoutStore, OrderSink, PaymentGateway};
use crate::domain::value_objects::DeviceId;
use crate::error::CheckoutResult;
use crate::presentation::dto::{OrderLookupQuery, StatusUpdateRequest, TrackingNumberRequest};
use crate::presentation::handlers::CheckoutAppState;

/// GET /api/checkout/admin/security/events
pub async fn security_events<S, G, K>(
    State(state): State<CheckoutAppState<S, G, K>>,
) -> CheckoutResult<Json<Vec<SecurityEvent>>>
where
    S: CheckoutStore,
    G: PaymentGateway + Send + Sync + 'static,
    K: OrderSink + Send + Sync + 'static,
{
    let log = SecurityLog::new(state.store.clone(), state.clock.clone());
    Ok(Json(log.list().await?))
}

/// DELETE /api/checkout/admin/security/devices/{device_id}/block
pub async fn clear_device_block<S, G, K>(
    State(state): State<CheckoutAppState<S, G, K>>,
    Path(device_id): Path<String>,
) -> CheckoutResult<StatusCode>
where
    S: CheckoutStore,
    G: PaymentGateway + Send + Sync + 'static,
    K: OrderSink + Send + Sync + 'static,
{
    let log = SecurityLog::new(state.store.clone(), state.clock.clone());
    log.clear_device_block(&DeviceId::new(device_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/checkout/admin/settings
pub async fn get_settings<S, G, K>(
    State(state): State<CheckoutAppState<S, G, K>>,
) -> Json<SecurityConfig>
where
    S: CheckoutStore,
    G: PaymentGateway + Send + Sync + 'static,
    K: OrderSink + Send + Sync + 'static,
{
    Json(SecuritySettings::new(state.store.clone()).current().await)
}

/// PUT /api/checkout/admin/settings
pub async fn update_settings<S, G, K>(
    State(state): State<CheckoutAppState<S, G, K>>,
    Json(config): Json<SecurityConfig>,
) -> CheckoutResult<Json<SecurityConfig>>
where
    S: CheckoutStore,
    G: PaymentGateway + Send + Sync + 'static,
    K: OrderSink + Send + Sync + 'static,
{
    SecuritySettings::new(state.store.clone())
        .update(&config)
        .await?;
    Ok(Json(config))
}

/// GET /api/checkout/admin/orders?phone=&email=
pub async fn find_orders<S, G, K>(
    State(state): State<CheckoutAppState<S, G, K>>,
    Query(query): Query<OrderLookupQuery>,
) -> CheckoutResult<Json<Vec<Order>>>
where
    S: CheckoutStore,
    G: PaymentGateway + Send + Sync + 'static,
    K: OrderSink + Send + Sync + 'static,
{
    let use_case = OrderTrackingUseCase::new(state.store.clone(), state.clock.clone());
    Ok(Json(
        use_case
            .find_by_contact(&query.phone, &query.email)
            .await?,
    ))
}

/// PUT /api/checkout/admin/orders/{order_number}/status
pub async fn update_order_status<S, G, K>(
    State(state): State<CheckoutAppState<S, G, K>>,
    Path(order_number): Path<String>,
    Json(req): Json<StatusUpdateRequest>,
) -> CheckoutResult<Json<Order>>
where
    S: CheckoutStore,
    G: PaymentGateway + Send + Sync + 'static,
    K: OrderSink + Send + Sync + 'static,
{
    let use_case = OrderTrackingUseCase::new(state.store.clone(), state.clock.clone());
    Ok(Json(
        use_case
            .update_status(&order_number, req.status, &req.note)
            .await?,
    ))
}

/// PUT /api/checkout/admin/orders/{order_number}/tracking
pub async fn set_tracking_number<S, G, K>(
    State(state): State<CheckoutAppState<S, G, K>>,
    Path(order_number): Path<String>,
    Json(req): Json<TrackingNumberRequest>,
) -> CheckoutResult<Json<Order>>
where
    S: CheckoutStore,
    G: PaymentGateway + Send + Sync + 'static,
    K: OrderSink + Send + Sync + 'static,
{
    let use_case = OrderTrackingUseCase::new(state.store.clone(), state.clock.clone());
    Ok(Json(
        use_case
            .set_tracking_number(&order_number, &req.tracking_number)
            .await?,
    ))
}
