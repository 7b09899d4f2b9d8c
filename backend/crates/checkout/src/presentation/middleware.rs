//! Checkout Middleware

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, header};
use axum::middleware::Next;
use axum::response::Response;

use crate::application::config::CheckoutConfig;
use crate::application::session::{SessionRegistry, parse_session_token, session_token};
use crate::error::CheckoutError;

/// Middleware state
#[derive(Clone)]
pub struct SessionLayerState {
    pub sessions: Arc<SessionRegistry>,
    pub config: Arc<CheckoutConfig>,
}

/// Resolve the caller's checkout session from its cookie, creating one (and
/// setting the cookie) on first contact or after expiry
///
/// The session is handed to handlers as an `Extension<Arc<CheckoutSession>>`.
pub async fn attach_session(
    State(state): State<SessionLayerState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let secret = &state.config.session_secret;
    let existing = match platform::cookie::extract_cookie(
        req.headers(),
        &state.config.session_cookie_name,
    )
    .and_then(|token| parse_session_token(&token, secret))
    {
        Some(id) => state.sessions.get(id).await,
        None => None,
    };

    let (session, set_cookie) = match existing {
        Some(session) => (session, None),
        None => {
            let session = state.sessions.create().await;
            let cookie = match session_token(session.id(), secret) {
                Ok(token) => state.config.cookie().header_value(&token),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to sign session token");
                    None
                }
            };
            (session, cookie)
        }
    };

    req.extensions_mut().insert(session);
    let mut response = next.run(req).await;
    if let Some(cookie) = set_cookie {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

/// Require `Authorization: Bearer <admin token>`
pub async fn require_admin(
    State(config): State<Arc<CheckoutConfig>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, CheckoutError> {
    let presented = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    match (config.admin_token.as_deref(), presented) {
        (Some(expected), Some(presented))
            if !expected.is_empty() && platform::crypto::secrets_match(expected, presented) =>
        {
            Ok(next.run(req).await)
        }
        _ => {
            tracing::warn!("Rejected admin request");
            Err(CheckoutError::AdminUnauthorized)
        }
    }
}
