//! Request middleware pipeline.
//!
//! Interceptors are plain values ([`Interceptor`]) collected into ordered
//! [`Chain`]s. A chain is applied to a route when the route is registered;
//! the first interceptor in the list is the outermost layer.
//!
//! # Chains
//!
//! ```text
//! base:      recover panic -> log request -> security headers
//! dynamic:   base -> session (load, save on exit) -> CSRF guard -> authenticate
//! protected: dynamic -> require authentication
//! ```
//!
//! Panic recovery is outermost so it also covers session save. The session
//! is loaded before the CSRF guard and authentication read it, and saved
//! after the handler so the handler's writes persist.

pub mod auth;
pub mod csrf;
pub mod logging;
pub mod recover;
pub mod security_headers;
pub mod session;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::MethodRouter,
};

use crate::state::AppState;

pub use auth::{AuthContext, LOGIN_PATH, authenticate, require_authentication};
pub use csrf::{CsrfError, CsrfToken, csrf_middleware};
pub use logging::log_request;
pub use recover::recover_panic;
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, vary_on_cookie};

/// One cross-cutting step of the request pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interceptor {
    /// Turn panics into `500` and close the connection.
    RecoverPanic,
    /// Request span, request id, start and completion logs.
    LogRequest,
    /// CSP, framing, sniffing and referrer headers.
    SecurityHeaders,
    /// Session layer: load on first access, save after the handler.
    Session,
    /// Issue and verify the anti-forgery token.
    Csrf,
    /// Resolve the authentication context.
    Authenticate,
    /// Redirect anonymous visitors to the login page.
    RequireAuthentication,
}

impl Interceptor {
    fn wrap(self, route: MethodRouter<AppState>, state: &AppState) -> MethodRouter<AppState> {
        match self {
            Self::RecoverPanic => route.layer(from_fn(recover_panic)),
            Self::LogRequest => route.layer(from_fn(log_request)),
            Self::SecurityHeaders => route.layer(from_fn(security_headers_middleware)),
            Self::Session => route
                .layer::<_, std::convert::Infallible>(from_fn(vary_on_cookie))
                .layer(state.session_layer().clone()),
            Self::Csrf => route.layer(from_fn_with_state(state.clone(), csrf_middleware)),
            Self::Authenticate => route.layer(from_fn_with_state(state.clone(), authenticate)),
            Self::RequireAuthentication => route.layer(from_fn(require_authentication)),
        }
    }
}

/// An ordered list of interceptors, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    interceptors: Vec<Interceptor>,
}

impl Chain {
    /// Interceptors every route gets.
    #[must_use]
    pub fn base() -> Self {
        Self {
            interceptors: vec![
                Interceptor::RecoverPanic,
                Interceptor::LogRequest,
                Interceptor::SecurityHeaders,
            ],
        }
    }

    /// Session-aware, CSRF-protected routes.
    #[must_use]
    pub fn dynamic() -> Self {
        Self::base().then([
            Interceptor::Session,
            Interceptor::Csrf,
            Interceptor::Authenticate,
        ])
    }

    /// Routes that require an authenticated user.
    #[must_use]
    pub fn protected() -> Self {
        Self::dynamic().then([Interceptor::RequireAuthentication])
    }

    /// Append interceptors inside the current ones.
    #[must_use]
    pub fn then(mut self, inner: impl IntoIterator<Item = Interceptor>) -> Self {
        self.interceptors.extend(inner);
        self
    }

    /// Interceptors in order, outermost first.
    #[must_use]
    pub fn interceptors(&self) -> &[Interceptor] {
        &self.interceptors
    }

    /// Wrap `route` so a request passes the interceptors in order.
    pub fn apply(&self, route: MethodRouter<AppState>, state: &AppState) -> MethodRouter<AppState> {
        // `layer` wraps outside what is already there, so add innermost first
        self.interceptors
            .iter()
            .rev()
            .fold(route, |route, interceptor| interceptor.wrap(route, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chains_share_prefix() {
        let base = Chain::base();
        let dynamic = Chain::dynamic();
        let protected = Chain::protected();

        assert!(dynamic.interceptors().starts_with(base.interceptors()));
        assert!(protected.interceptors().starts_with(dynamic.interceptors()));
        assert_eq!(
            protected.interceptors().len(),
            dynamic.interceptors().len() + 1
        );
    }

    #[test]
    fn test_recovery_is_outermost() {
        for chain in [Chain::base(), Chain::dynamic(), Chain::protected()] {
            assert_eq!(chain.interceptors().first(), Some(&Interceptor::RecoverPanic));
        }
    }

    #[test]
    fn test_dynamic_order() {
        assert_eq!(
            Chain::dynamic().interceptors(),
            &[
                Interceptor::RecoverPanic,
                Interceptor::LogRequest,
                Interceptor::SecurityHeaders,
                Interceptor::Session,
                Interceptor::Csrf,
                Interceptor::Authenticate,
            ]
        );
    }

    #[test]
    fn test_gate_is_innermost_on_protected() {
        assert_eq!(
            Chain::protected().interceptors().last(),
            Some(&Interceptor::RequireAuthentication)
        );
    }
}
