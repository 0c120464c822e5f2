//! CSRF guard.
//!
//! Every dynamic session holds one random token under
//! [`session_keys::CSRF_TOKEN`]. Pages embed it as a hidden form field and
//! state-changing requests (`POST`, `PUT`, `PATCH`, `DELETE`) must send it
//! back, either in that field of a url-encoded body or in the
//! `x-csrf-token` header. A missing or different token rejects the request
//! with `400` before the handler runs.

use axum::{
    body::{Body, to_bytes},
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, Method, header::CONTENT_TYPE, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use thiserror::Error;

use crate::error::AppError;
use crate::models::session_keys;
use crate::session::{Session, SessionError};
use crate::state::AppState;

/// Header accepted as an alternative to the form field.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Random bytes per token.
const TOKEN_BYTES: usize = 32;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Largest form body buffered for token extraction.
const MAX_FORM_BYTES: usize = 64 * 1024;

/// Errors produced by the CSRF guard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CsrfError {
    /// The request carried no token.
    #[error("missing CSRF token")]
    Missing,
    /// The request carried a token that does not match the session's.
    #[error("CSRF token mismatch")]
    Mismatch,
}

/// The current session's token, for embedding in rendered forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken(pub String);

impl CsrfToken {
    /// Token value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| AppError::Internal("CSRF token used on a route without one".to_string()))
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Return the session's token, issuing one if it has none.
///
/// # Errors
///
/// Returns `SessionError` if the session cannot be read or written.
pub async fn ensure_token(session: &Session) -> Result<String, SessionError> {
    if let Some(token) = session.get::<String>(session_keys::CSRF_TOKEN).await? {
        return Ok(token);
    }
    rotate_token(session).await
}

/// Replace the session's token with a new one.
///
/// Called on login so a token seen before authentication is useless after.
///
/// # Errors
///
/// Returns `SessionError` if the token cannot be stored.
pub async fn rotate_token(session: &Session) -> Result<String, SessionError> {
    let token = generate_token();
    session.insert(session_keys::CSRF_TOKEN, &token).await?;
    Ok(token)
}

/// Compare a submitted token against the expected one.
///
/// # Errors
///
/// Returns `CsrfError::Missing` for an absent or empty submission and
/// `CsrfError::Mismatch` for a wrong one.
pub fn verify(expected: &str, submitted: Option<&str>) -> Result<(), CsrfError> {
    let submitted = submitted.filter(|s| !s.is_empty()).ok_or(CsrfError::Missing)?;
    if constant_time_compare(expected, submitted) {
        Ok(())
    } else {
        Err(CsrfError::Mismatch)
    }
}

/// Compare two strings without short-circuiting on the first difference.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Whether the body is url-encoded. Media types are case-insensitive.
fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|essence| {
            essence
                .trim()
                .eq_ignore_ascii_case(FORM_CONTENT_TYPE)
        })
}

fn form_field(body: &[u8], field: &str) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(name, _)| name == field)
        .map(|(_, value)| value.into_owned())
}

/// Ensure a token exists and verify it on state-changing requests.
pub async fn csrf_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    match guard(&state, request).await {
        Ok(request) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

async fn guard(state: &AppState, mut request: Request) -> Result<Request, AppError> {
    let session = request
        .extensions()
        .get::<Session>()
        .cloned()
        .ok_or_else(|| AppError::Internal("CSRF guard ran before session load".to_string()))?;

    let expected = ensure_token(&session).await?;

    if is_state_changing(request.method()) {
        let header_token = request
            .headers()
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let submitted = if is_form(request.headers()) {
            let (mut parts, body) = request.into_parts();
            let bytes = to_bytes(body, MAX_FORM_BYTES)
                .await
                .map_err(|e| AppError::BadRequest(format!("unreadable form body: {e}")))?;
            let field_token = form_field(&bytes, &state.config().csrf_field);
            // The form extractor matches the media type case-sensitively
            parts
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
            request = Request::from_parts(parts, Body::from(bytes));
            field_token.or(header_token)
        } else {
            header_token
        };

        if let Err(e) = verify(&expected, submitted.as_deref()) {
            tracing::warn!(error = %e, "rejected state-changing request");
            return Err(e.into());
        }
    }

    request.extensions_mut().insert(CsrfToken(expected));
    Ok(request)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "ab"));
    }

    #[test]
    fn test_verify() {
        assert_eq!(verify("token", Some("token")), Ok(()));
        assert_eq!(verify("token", Some("other")), Err(CsrfError::Mismatch));
        assert_eq!(verify("token", Some("")), Err(CsrfError::Missing));
        assert_eq!(verify("token", None), Err(CsrfError::Missing));
    }

    #[test]
    fn test_generated_tokens_are_url_safe_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[tokio::test]
    async fn test_ensure_token_is_stable_until_rotated() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let first = ensure_token(&session).await.unwrap();
        assert_eq!(ensure_token(&session).await.unwrap(), first);

        let rotated = rotate_token(&session).await.unwrap();
        assert_ne!(rotated, first);
        assert_eq!(ensure_token(&session).await.unwrap(), rotated);
    }

    #[test]
    fn test_is_form_ignores_case_and_parameters() {
        let form = |value: &'static str| {
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(value));
            is_form(&headers)
        };

        assert!(form("application/x-www-form-urlencoded"));
        assert!(form("Application/X-WWW-Form-Urlencoded"));
        assert!(form("application/x-www-form-urlencoded; charset=UTF-8"));
        assert!(!form("application/x-www-form-urlencoded-extra"));
        assert!(!form("multipart/form-data; boundary=x"));
        assert!(!is_form(&HeaderMap::new()));
    }

    #[test]
    fn test_form_field_decodes_values() {
        let body = b"title=Hi&csrf_token=a%2Bb&content=x";
        assert_eq!(form_field(body, "csrf_token").as_deref(), Some("a+b"));
        assert_eq!(form_field(body, "missing"), None);
    }

    #[test]
    fn test_state_changing_methods() {
        assert!(is_state_changing(&Method::POST));
        assert!(is_state_changing(&Method::DELETE));
        assert!(!is_state_changing(&Method::GET));
        assert!(!is_state_changing(&Method::HEAD));
    }
}
