//! Snippet repository backed by `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use snippetbox_core::SnippetId;

use super::{LATEST_SNIPPETS_LIMIT, RepositoryError, SnippetStore};
use crate::models::{NewSnippet, Snippet};

#[derive(Debug, sqlx::FromRow)]
struct SnippetRow {
    id: SnippetId,
    title: String,
    content: String,
    created: DateTime<Utc>,
    expires: DateTime<Utc>,
}

impl From<SnippetRow> for Snippet {
    fn from(row: SnippetRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            created: row.created,
            expires: row.expires,
        }
    }
}

/// `PostgreSQL` snippet store.
#[derive(Debug, Clone)]
pub struct PgSnippetStore {
    pool: PgPool,
}

impl PgSnippetStore {
    /// Create a new snippet store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnippetStore for PgSnippetStore {
    async fn get(&self, id: SnippetId) -> Result<Snippet, RepositoryError> {
        let row = sqlx::query_as::<_, SnippetRow>(
            r"
            SELECT id, title, content, created, expires
            FROM snippets
            WHERE expires > NOW() AND id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Snippet::from).ok_or(RepositoryError::NotFound)
    }

    async fn insert(&self, snippet: &NewSnippet) -> Result<SnippetId, RepositoryError> {
        let days = i32::try_from(snippet.expires_days).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "expiry of {} days is out of range",
                snippet.expires_days
            ))
        })?;

        let id = sqlx::query_scalar::<_, SnippetId>(
            r"
            INSERT INTO snippets (title, content, created, expires)
            VALUES ($1, $2, NOW(), NOW() + make_interval(days => $3))
            RETURNING id
            ",
        )
        .bind(&snippet.title)
        .bind(&snippet.content)
        .bind(days)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn latest(&self) -> Result<Vec<Snippet>, RepositoryError> {
        #[allow(clippy::cast_possible_wrap)]
        let limit = LATEST_SNIPPETS_LIMIT as i64;

        let rows = sqlx::query_as::<_, SnippetRow>(
            r"
            SELECT id, title, content, created, expires
            FROM snippets
            WHERE expires > NOW()
            ORDER BY id DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Snippet::from).collect())
    }
}
