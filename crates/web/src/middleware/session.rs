//! Session middleware configuration.
//!
//! Sets up tower-sessions over the configured store with a sliding expiry:
//! every request carrying a non-empty session saves it, pushing its expiry
//! out by the configured lifetime and re-issuing the cookie.
//!
//! The layer loads the record on first access and saves it after the
//! handler returns, so handler writes (login, flash messages) persist.
//! Client errors are saved the same way; a `5xx` response is not saved.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{HeaderValue, header},
    middleware::Next,
    response::Response,
};
use tower_sessions::{
    Expiry, SessionManagerLayer, SessionStore,
    cookie::{SameSite, time::Duration},
};

use crate::config::SessionConfig;
use crate::session::SessionBackend;

/// Create the session layer over `store`.
#[must_use]
pub fn create_session_layer(
    store: Arc<dyn SessionStore>,
    config: &SessionConfig,
) -> SessionManagerLayer<SessionBackend> {
    SessionManagerLayer::new(SessionBackend::new(store))
        .with_name(config.cookie_name.clone())
        .with_expiry(Expiry::OnInactivity(Duration::hours(i64::from(
            config.lifetime_hours,
        ))))
        .with_secure(config.secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_always_save(true)
}

/// Mark session-aware responses as varying by cookie.
pub async fn vary_on_cookie(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Cookie"));
    response
}
