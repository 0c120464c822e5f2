//! HTTP route handlers and the route table.
//!
//! # Route Structure
//!
//! ```text
//! GET       /                   - Latest snippets            (dynamic)
//! GET       /about              - About page                 (dynamic)
//! GET       /health             - Liveness probe             (public)
//! GET       /snippet/view/{id}  - Single snippet             (dynamic)
//! GET, POST /snippet/create     - Create a snippet           (protected)
//! GET, POST /user/signup        - Signup                     (dynamic)
//! GET, POST /user/login         - Login                      (dynamic)
//! POST      /user/logout        - Logout                     (protected)
//! GET       /account/view       - Account details            (protected)
//! GET       /static/*           - Static files               (public)
//! ```
//!
//! Each route is registered with a [`Policy`]; the policy picks the
//! interceptor [`Chain`] wrapped around the handler. Unmatched paths get a
//! `404` through the base chain.

pub mod home;
pub mod snippets;
pub mod user;

use axum::{
    Router,
    routing::{MethodRouter, any, get, get_service, post},
};
use tower_http::services::ServeDir;

use crate::error::AppError;
use crate::middleware::Chain;
use crate::state::AppState;

/// Access policy of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// No session, no CSRF check.
    Public,
    /// Session-aware and CSRF-protected; the visitor may be anonymous.
    Dynamic,
    /// Like `Dynamic`, but only for authenticated users.
    Protected,
}

impl Policy {
    /// Interceptors wrapped around routes with this policy.
    #[must_use]
    pub fn chain(self) -> Chain {
        match self {
            Self::Public => Chain::base(),
            Self::Dynamic => Chain::dynamic(),
            Self::Protected => Chain::protected(),
        }
    }
}

/// One row of the route table.
pub struct RouteEntry {
    pub path: &'static str,
    pub policy: Policy,
    pub handler: MethodRouter<AppState>,
}

impl RouteEntry {
    /// Create a route entry.
    #[must_use]
    pub fn new(path: &'static str, policy: Policy, handler: MethodRouter<AppState>) -> Self {
        Self {
            path,
            policy,
            handler,
        }
    }
}

/// The application's routes.
#[must_use]
pub fn route_table() -> Vec<RouteEntry> {
    use Policy::{Dynamic, Protected, Public};

    vec![
        RouteEntry::new("/", Dynamic, get(home::home)),
        RouteEntry::new("/about", Dynamic, get(home::about)),
        RouteEntry::new("/health", Public, get(health)),
        RouteEntry::new("/snippet/view/{id}", Dynamic, get(snippets::view)),
        RouteEntry::new(
            "/snippet/create",
            Protected,
            get(snippets::create_form).post(snippets::create),
        ),
        RouteEntry::new(
            "/user/signup",
            Dynamic,
            get(user::signup_form).post(user::signup),
        ),
        RouteEntry::new(
            "/user/login",
            Dynamic,
            get(user::login_form).post(user::login),
        ),
        RouteEntry::new("/user/logout", Protected, post(user::logout)),
        RouteEntry::new("/account/view", Protected, get(user::account)),
    ]
}

/// Build a router from route entries, wrapping each handler in its chain.
///
/// Static files and the not-found fallback get the base chain.
pub fn build_router(state: AppState, entries: Vec<RouteEntry>) -> Router {
    let mut router = Router::new();
    for entry in entries {
        let route = entry.policy.chain().apply(entry.handler, &state);
        router = router.route(entry.path, route);
    }

    let static_files = Chain::base()
        .apply(get_service(ServeDir::new(&state.config().static_dir)), &state)
        .with_state::<()>(state.clone());
    let fallback = Chain::base()
        .apply(any(not_found), &state)
        .with_state::<()>(state.clone());

    router
        .nest_service("/static", static_files)
        .fallback_service(fallback)
        .with_state(state)
}

/// The application router.
pub fn router(state: AppState) -> Router {
    build_router(state, route_table())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

async fn not_found() -> AppError {
    AppError::NotFound("no such route".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_paths_are_unique() {
        let table = route_table();
        let mut paths: Vec<_> = table.iter().map(|entry| entry.path).collect();
        paths.sort_unstable();
        paths.dedup();
        assert_eq!(paths.len(), table.len());
    }

    #[test]
    fn test_policies() {
        let policy_of = |path: &str| {
            route_table()
                .into_iter()
                .find(|entry| entry.path == path)
                .map(|entry| entry.policy)
        };

        assert_eq!(policy_of("/"), Some(Policy::Dynamic));
        assert_eq!(policy_of("/health"), Some(Policy::Public));
        assert_eq!(policy_of("/snippet/view/{id}"), Some(Policy::Dynamic));
        assert_eq!(policy_of("/user/login"), Some(Policy::Dynamic));
        assert_eq!(policy_of("/snippet/create"), Some(Policy::Protected));
        assert_eq!(policy_of("/user/logout"), Some(Policy::Protected));
        assert_eq!(policy_of("/account/view"), Some(Policy::Protected));
    }

    #[test]
    fn test_policy_chains() {
        assert_eq!(Policy::Public.chain(), Chain::base());
        assert_eq!(Policy::Dynamic.chain(), Chain::dynamic());
        assert_eq!(Policy::Protected.chain(), Chain::protected());
    }
}
