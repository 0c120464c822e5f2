//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use tower_sessions::{MemoryStore, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::WebConfig;
use crate::db::{
    MemorySnippetStore, MemoryUserStore, PgSnippetStore, PgUserStore, SnippetStore, UserStore,
};
use crate::middleware::create_session_layer;
use crate::session::SessionBackend;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// immutable configuration and the stores.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    snippets: Arc<dyn SnippetStore>,
    users: Arc<dyn UserStore>,
    session_layer: SessionManagerLayer<SessionBackend>,
}

impl AppState {
    /// Create application state from explicit stores.
    #[must_use]
    pub fn new(
        config: WebConfig,
        snippets: Arc<dyn SnippetStore>,
        users: Arc<dyn UserStore>,
        session_store: Arc<dyn SessionStore>,
    ) -> Self {
        let session_layer = create_session_layer(session_store, &config.session);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                snippets,
                users,
                session_layer,
            }),
        }
    }

    /// State backed by `PostgreSQL` for content, users and sessions.
    ///
    /// The session table must already exist (see the `migrate` command).
    #[must_use]
    pub fn postgres(config: WebConfig, pool: PgPool) -> Self {
        Self::new(
            config,
            Arc::new(PgSnippetStore::new(pool.clone())),
            Arc::new(PgUserStore::new(pool.clone())),
            Arc::new(PostgresStore::new(pool)),
        )
    }

    /// State held entirely in memory.
    #[must_use]
    pub fn in_memory(config: WebConfig) -> Self {
        Self::new(
            config,
            Arc::new(MemorySnippetStore::new()),
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemoryStore::default()),
        )
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// Get a reference to the snippet store.
    #[must_use]
    pub fn snippets(&self) -> &dyn SnippetStore {
        self.inner.snippets.as_ref()
    }

    /// Get a reference to the user store.
    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.users.as_ref()
    }

    /// Session layer wrapped around dynamic routes.
    #[must_use]
    pub fn session_layer(&self) -> &SessionManagerLayer<SessionBackend> {
        &self.inner.session_layer
    }
}
