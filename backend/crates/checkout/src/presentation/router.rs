//! Checkout Router

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::domain::repository::{CheckoutStore, OrderSink, PaymentGateway};
use crate::presentation::admin;
use crate::presentation::handlers::{self, CheckoutAppState};
use crate::presentation::middleware::{attach_session, require_admin};

/// Create the checkout router; every storefront route runs inside a checkout
/// session. Admin routes are nested under `/admin` when an admin token is set.
pub fn checkout_router<S, G, K>(state: CheckoutAppState<S, G, K>) -> Router
where
    S: CheckoutStore,
    G: PaymentGateway + Send + Sync + 'static,
    K: OrderSink + Send + Sync + 'static,
{
    let session_layer = middleware::from_fn_with_state(state.session_layer(), attach_session);

    let storefront = Router::new()
        .route("/challenge", get(handlers::issue_challenge::<S, G, K>))
        .route("/cart", put(handlers::replace_cart::<S, G, K>))
        .route("/coupon", post(handlers::check_coupon::<S, G, K>))
        .route("/coupons", get(handlers::list_coupons::<S, G, K>))
        .route(
            "/points/exchange",
            post(handlers::exchange_points::<S, G, K>),
        )
        .route("/submit", post(handlers::submit_order::<S, G, K>))
        .route(
            "/orders/{order_number}",
            get(handlers::get_order::<S, G, K>),
        )
        .layer(session_layer)
        .with_state(state.clone());

    if state.config.admin_token.is_none() {
        return storefront;
    }
    storefront.nest("/admin", admin_router(state))
}

/// Staff routes behind the admin bearer token
pub fn admin_router<S, G, K>(state: CheckoutAppState<S, G, K>) -> Router
where
    S: CheckoutStore,
    G: PaymentGateway + Send + Sync + 'static,
    K: OrderSink + Send + Sync + 'static,
{
    let admin_layer = middleware::from_fn_with_state(state.config.clone(), require_admin);

    Router::new()
        .route("/security/events", get(admin::security_events::<S, G, K>))
        .route(
            "/security/devices/{device_id}/block",
            delete(admin::clear_device_block::<S, G, K>),
        )
        .route(
            "/settings",
            get(admin::get_settings::<S, G, K>).put(admin::update_settings::<S, G, K>),
        )
        .route("/orders", get(admin::find_orders::<S, G, K>))
        .route(
            "/orders/{order_number}/status",
            put(admin::update_order_status::<S, G, K>),
        )
        .route(
            "/orders/{order_number}/tracking",
            put(admin::set_tracking_number::<S, G, K>),
        )
        .layer(admin_layer)
        .with_state(state)
}
