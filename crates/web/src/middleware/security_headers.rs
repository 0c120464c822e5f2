//! Security headers middleware for XSS, clickjacking, and referrer protection.
//!
//! Part of the base chain, so static files, 404s and recovered panics carry
//! the same headers as rendered pages.

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{
            CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

/// Content Security Policy applied to every response.
pub const CONTENT_SECURITY_POLICY_VALUE: &str = "default-src 'self'; \
     style-src 'self'; \
     font-src 'self'; \
     form-action 'self'; \
     frame-ancestors 'none'; \
     base-uri 'self'";

/// Add security headers to all responses.
///
/// Headers applied:
/// - `Content-Security-Policy` - same-origin resources and form targets only
/// - `Referrer-Policy: origin-when-cross-origin`
/// - `X-Content-Type-Options: nosniff` - Prevent MIME sniffing
/// - `X-Frame-Options: deny` - Prevent clickjacking
/// - `X-XSS-Protection: 0` - Disable the legacy browser auditor
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(CONTENT_SECURITY_POLICY_VALUE),
    );
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("origin-when-cross-origin"),
    );
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("deny"));
    headers.insert(
        HeaderName::from_static("x-xss-protection"),
        HeaderValue::from_static("0"),
    );

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::StatusCode, middleware::from_fn};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_headers_set_even_on_fallback() {
        let app = Router::new()
            .fallback(|| async { StatusCode::NOT_FOUND })
            .layer(from_fn(security_headers_middleware));

        let response = app
            .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let headers = response.headers();
        assert_eq!(headers[CONTENT_SECURITY_POLICY], CONTENT_SECURITY_POLICY_VALUE);
        assert_eq!(headers[REFERRER_POLICY], "origin-when-cross-origin");
        assert_eq!(headers[X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[X_FRAME_OPTIONS], "deny");
        assert_eq!(headers["x-xss-protection"], "0");
    }
}
