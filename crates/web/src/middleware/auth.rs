//! Authentication context and the authorization gate.
//!
//! [`authenticate`] runs on every dynamic request: it reads the user id from
//! the session and re-checks it against the user store, so a deleted
//! account stops being authenticated on its very next request.
//! [`require_authentication`] closes protected routes to anonymous visitors.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderValue, Method, header::CACHE_CONTROL, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::Span;

use snippetbox_core::UserId;

use crate::db::UserStore;
use crate::error::{AppError, set_sentry_user};
use crate::models::session_keys;
use crate::services::auth::AuthService;
use crate::session::Session;
use crate::state::AppState;

/// Where anonymous visitors to protected routes are sent.
pub const LOGIN_PATH: &str = "/user/login";

/// Request-scoped authentication state. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthContext {
    user_id: Option<UserId>,
}

impl AuthContext {
    /// Context for an authenticated user.
    #[must_use]
    pub const fn authenticated(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    /// Context for an anonymous visitor.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user_id: None }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        self.user_id
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().copied().unwrap_or_default())
    }
}

/// Derive the authentication context from the session.
///
/// A stored id whose user no longer exists, or that cannot be checked, is
/// scrubbed from the session and the request proceeds anonymously. An
/// unreadable session also proceeds anonymously.
pub async fn resolve(session: &Session, users: &dyn UserStore) -> AuthContext {
    let user_id = match session.get::<UserId>(session_keys::AUTHENTICATED_USER_ID).await {
        Ok(Some(user_id)) => user_id,
        Ok(None) => return AuthContext::anonymous(),
        Err(e) => {
            tracing::warn!(error = %e, "unreadable session, treating request as anonymous");
            return AuthContext::anonymous();
        }
    };

    match AuthService::new(users).user_exists(user_id).await {
        Ok(true) => return AuthContext::authenticated(user_id),
        Ok(false) => {
            tracing::info!(%user_id, "session refers to a missing user, signing out");
        }
        Err(e) => {
            tracing::warn!(%user_id, error = %e, "user lookup failed, treating request as anonymous");
        }
    }

    if let Err(e) = session
        .remove_value(session_keys::AUTHENTICATED_USER_ID)
        .await
    {
        tracing::warn!(%user_id, error = %e, "could not scrub stale user id");
    }
    AuthContext::anonymous()
}

/// Attach an [`AuthContext`] to the request.
pub async fn authenticate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let Some(session) = request.extensions().get::<Session>().cloned() else {
        return AppError::Internal("authentication ran before session load".to_string())
            .into_response();
    };

    let context = resolve(&session, state.users()).await;
    if let Some(user_id) = context.user_id() {
        Span::current().record("user_id", user_id.as_i32());
        set_sentry_user(&user_id);
    }

    request.extensions_mut().insert(context);
    next.run(request).await
}

/// Redirect anonymous visitors to the login page.
///
/// The target handler is never invoked for them. For `GET` requests the
/// requested path is remembered so login can return there. Authenticated
/// responses are marked `Cache-Control: no-store`.
pub async fn require_authentication(request: Request, next: Next) -> Response {
    let context = request
        .extensions()
        .get::<AuthContext>()
        .copied()
        .unwrap_or_default();

    if !context.is_authenticated() {
        let session = request.extensions().get::<Session>().cloned();
        if request.method() == Method::GET
            && let Some(session) = session
        {
            let target = request
                .uri()
                .path_and_query()
                .map_or_else(|| request.uri().path().to_owned(), ToString::to_string);
            if let Err(e) = session
                .insert(session_keys::REDIRECT_AFTER_LOGIN, target)
                .await
            {
                return AppError::from(e).into_response();
            }
        }
        return Redirect::to(LOGIN_PATH).into_response();
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
