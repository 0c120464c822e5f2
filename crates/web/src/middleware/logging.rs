//! Request logging and request ids.
//!
//! Every request runs inside a `request` span carrying its id, method,
//! path, client address and HTTP version. Start and completion (status and
//! latency) are logged from here, so handlers cannot skip them.
//!
//! The request id comes from an upstream `x-request-id` header when present,
//! otherwise a UUID v4 is generated. It is echoed in the response and set as
//! a Sentry tag for error correlation.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream request id accepted verbatim.
const MAX_REQUEST_ID_LENGTH: usize = 128;

/// Log the request inside a span and tag the response with its request id.
pub async fn log_request(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LENGTH)
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        remote_addr = remote_addr.as_deref().unwrap_or("-"),
        version = ?request.version(),
        user_id = tracing::field::Empty,
    );

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    async move {
        let started = Instant::now();
        tracing::info!("request started");

        let mut response = next.run(request).await;

        let status = response.status();
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), latency_ms, "request failed");
        } else {
            tracing::info!(status = status.as_u16(), latency_ms, "request completed");
        }

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }

        response
    }
    .instrument(span)
    .await
}
