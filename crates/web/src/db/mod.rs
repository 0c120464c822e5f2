//! Content and user stores.
//!
//! # Database: `snippetbox`
//!
//! ## Tables
//!
//! - `snippets` - Text snippets with an expiry date
//! - `users` - Registered users (unique email, Argon2 password hash)
//! - `tower_sessions.session` - Session records, owned by `PostgresStore`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p snippetbox-cli -- migrate
//! ```
//!
//! Both stores sit behind object-safe traits so the request pipeline can
//! run against the in-memory implementations in [`memory`] during tests.

pub mod memory;
pub mod snippets;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use snippetbox_core::{Email, SnippetId, UserId};

use crate::models::{NewSnippet, Snippet, User};

pub use memory::{MemorySnippetStore, MemoryUserStore};
pub use snippets::PgSnippetStore;
pub use users::PgUserStore;

/// Number of snippets returned by [`SnippetStore::latest`].
pub const LATEST_SNIPPETS_LIMIT: usize = 10;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Snippet storage.
#[async_trait]
pub trait SnippetStore: Send + Sync + 'static {
    /// Fetch a snippet that has not yet expired.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no live snippet has this id.
    async fn get(&self, id: SnippetId) -> Result<Snippet, RepositoryError>;

    /// Store a new snippet and return its id.
    async fn insert(&self, snippet: &NewSnippet) -> Result<SnippetId, RepositoryError>;

    /// The most recent live snippets, newest first.
    async fn latest(&self) -> Result<Vec<Snippet>, RepositoryError>;
}

/// User account storage.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Create a user and return its id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    async fn insert(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<UserId, RepositoryError>;

    /// Look up the id and password hash registered for an email.
    async fn credentials(&self, email: &Email)
    -> Result<Option<(UserId, String)>, RepositoryError>;

    /// Whether a user with this id currently exists.
    async fn exists(&self, id: UserId) -> Result<bool, RepositoryError>;

    /// Fetch a user by id.
    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Delete the user registered under an email.
    ///
    /// Returns `true` if a user was deleted.
    async fn delete_by_email(&self, email: &Email) -> Result<bool, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-constraint violation to `RepositoryError::Conflict`.
fn conflict_on_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}
