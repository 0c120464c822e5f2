//! End-to-end test support for Snippetbox.
//!
//! [`TestServer`] binds the full application router to an ephemeral port so
//! tests can talk to it with a real HTTP client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p snippetbox-integration-tests
//!
//! # Including the PostgreSQL-backed tests
//! SNIPPETBOX_TEST_DATABASE_URL=postgres://localhost/snippetbox_test \
//!     cargo test -p snippetbox-integration-tests -- --include-ignored
//! ```

use std::net::SocketAddr;

use reqwest::{Client, redirect};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use snippetbox_web::config::WebConfig;
use snippetbox_web::routes;
use snippetbox_web::state::AppState;

/// A running application bound to `127.0.0.1` on a free port.
pub struct TestServer {
    addr: SocketAddr,
    state: AppState,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server over in-memory stores.
    pub async fn start() -> Self {
        Self::with_state(AppState::in_memory(WebConfig::development())).await
    }

    /// Start a server over the given state.
    pub async fn with_state(state: AppState) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");
        let app = routes::router(state.clone());

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Test server error");
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// The state the server runs on.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A client that keeps cookies and does not follow redirects.
#[must_use]
pub fn browser() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Value of the hidden CSRF field in a rendered page.
#[must_use]
pub fn csrf_token(html: &str) -> Option<String> {
    let marker = r#"name="csrf_token" value=""#;
    let start = html.find(marker)? + marker.len();
    let len = html.get(start..)?.find('"')?;
    html.get(start..start + len).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csrf_token_extraction() {
        let html = r#"<input type="hidden" name="csrf_token" value="abc-123_x">"#;
        assert_eq!(csrf_token(html).as_deref(), Some("abc-123_x"));
        assert_eq!(csrf_token("<form></form>"), None);
    }
}
