//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router, http,
    http::{Method, header},
};
use base64::Engine;
use base64::engine::general_purpose;
use checkout::application::config::SameSite;
use checkout::application::coupon_engine::CouponBook;
use checkout::application::payment::PaymentSimulator;
use checkout::application::session::SessionRegistry;
use checkout::infra::catalog::StaticCatalog;
use checkout::infra::remote_sink::ConfiguredSink;
use checkout::presentation::handlers::CheckoutAppState;
use checkout::{CheckoutConfig, KvRepository, SqliteStore, checkout_router};
use platform::clock::{Clock, SystemClock};
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

/// How often idle checkout sessions are dropped
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,checkout=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Local order store
    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://checkout.db".to_string());
    let sqlite = SqliteStore::connect(&database_url, 5)
        .await
        .with_context(|| format!("Failed to open order store at {database_url}"))?;

    tracing::info!(database_url = %database_url, "Order store ready");

    // Checkout configuration
    let mut config = if cfg!(debug_assertions) {
        CheckoutConfig::development()
    } else {
        // In production, load secret from environment
        let secret_b64 = env::var("CHECKOUT_SESSION_SECRET")
            .context("CHECKOUT_SESSION_SECRET must be set in production")?;
        let member_b64 = env::var("MEMBER_TOKEN_SECRET")
            .context("MEMBER_TOKEN_SECRET must be set in production")?;
        CheckoutConfig {
            session_secret: decode_secret("CHECKOUT_SESSION_SECRET", &secret_b64)?,
            member_secret: decode_secret("MEMBER_TOKEN_SECRET", &member_b64)?,
            ..CheckoutConfig::default()
        }
    };
    // Development keeps a random member secret unless one is shared
    if cfg!(debug_assertions) {
        if let Ok(member_b64) = env::var("MEMBER_TOKEN_SECRET") {
            config.member_secret = decode_secret("MEMBER_TOKEN_SECRET", &member_b64)?;
        }
    }
    config.admin_token = env::var("ADMIN_TOKEN")
        .ok()
        .filter(|token| !token.trim().is_empty());
    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN not set, admin routes are disabled");
    }
    if let Some(same_site) = env::var("COOKIE_SAME_SITE")
        .ok()
        .and_then(|value| SameSite::parse(&value))
    {
        config.cookie_same_site = same_site;
    }
    config.order_sink_url = env::var("ORDER_SINK_URL")
        .ok()
        .filter(|url| !url.trim().is_empty());

    let sink = ConfiguredSink::from_url(config.order_sink_url.as_deref())?;
    if config.order_sink_url.is_none() {
        tracing::warn!("ORDER_SINK_URL not set, orders are only stored locally");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let session_ttl = chrono::TimeDelta::seconds(config.session_ttl_secs());
    let sessions = Arc::new(SessionRegistry::new(session_ttl, clock.clone()));

    let catalog = StaticCatalog::coffee_defaults();
    tracing::info!(prices = catalog.len(), "Catalog loaded");

    let state = CheckoutAppState {
        store: Arc::new(KvRepository::new(sqlite)),
        gateway: Arc::new(PaymentSimulator::new(clock.clone(), config.payment_latency)),
        sink: Arc::new(sink),
        catalog: Arc::new(catalog),
        coupons: Arc::new(CouponBook::builtin()),
        sessions,
        clock,
        config: Arc::new(config),
    };

    // Startup and periodic cleanup of idle sessions and their device ids
    let purge_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = purge_state.purge_expired_sessions().await;
            if purged > 0 {
                tracing::info!(sessions_purged = purged, "Checkout session cleanup completed");
            }
        }
    });

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:40922,http://127.0.0.1:40922".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ACCEPT_LANGUAGE,
            header::AUTHORIZATION,
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .nest("/api/checkout", checkout_router(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr: SocketAddr = env::var("LISTEN_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:31113".to_string())
        .parse()
        .context("LISTEN_ADDR must be a socket address")?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Decode a base64 secret that must be exactly 32 bytes
fn decode_secret(name: &str, value: &str) -> anyhow::Result<[u8; 32]> {
    let bytes = Engine::decode(&general_purpose::STANDARD, value)
        .with_context(|| format!("{name} is not valid base64"))?;
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("{name} must decode to 32 bytes"))
}
