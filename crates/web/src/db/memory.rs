//! In-memory stores.
//!
//! Used by tests and local demos; state lives only as long as the process.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use snippetbox_core::{Email, SnippetId, UserId};

use super::{LATEST_SNIPPETS_LIMIT, RepositoryError, SnippetStore, UserStore};
use crate::models::{NewSnippet, Snippet, User};

/// Snippet store kept in a vector, ids assigned sequentially from 1.
#[derive(Debug, Default)]
pub struct MemorySnippetStore {
    snippets: RwLock<Vec<Snippet>>,
}

impl MemorySnippetStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnippetStore for MemorySnippetStore {
    async fn get(&self, id: SnippetId) -> Result<Snippet, RepositoryError> {
        let now = Utc::now();
        self.snippets
            .read()
            .await
            .iter()
            .find(|s| s.id == id && s.is_live(now))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn insert(&self, snippet: &NewSnippet) -> Result<SnippetId, RepositoryError> {
        let mut snippets = self.snippets.write().await;
        let next = i32::try_from(snippets.len() + 1)
            .map_err(|_| RepositoryError::Conflict("snippet id space exhausted".to_owned()))?;
        let id = SnippetId::new(next);
        let created = Utc::now();

        snippets.push(Snippet {
            id,
            title: snippet.title.clone(),
            content: snippet.content.clone(),
            created,
            expires: created + Duration::days(i64::from(snippet.expires_days)),
        });

        Ok(id)
    }

    async fn latest(&self) -> Result<Vec<Snippet>, RepositoryError> {
        let now = Utc::now();
        Ok(self
            .snippets
            .read()
            .await
            .iter()
            .rev()
            .filter(|s| s.is_live(now))
            .take(LATEST_SNIPPETS_LIMIT)
            .cloned()
            .collect())
    }
}

#[derive(Debug)]
struct StoredUser {
    user: User,
    password_hash: String,
}

/// User store kept in a vector. Deleted ids are never reused.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    inner: RwLock<Users>,
}

#[derive(Debug, Default)]
struct Users {
    next_id: i32,
    rows: Vec<StoredUser>,
}

impl MemoryUserStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<UserId, RepositoryError> {
        let mut users = self.inner.write().await;
        if users.rows.iter().any(|u| u.user.email == *email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        users.next_id += 1;
        let id = UserId::new(users.next_id);
        users.rows.push(StoredUser {
            user: User {
                id,
                name: name.to_owned(),
                email: email.clone(),
                created: Utc::now(),
            },
            password_hash: password_hash.to_owned(),
        });

        Ok(id)
    }

    async fn credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(UserId, String)>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .rows
            .iter()
            .find(|u| u.user.email == *email)
            .map(|u| (u.user.id, u.password_hash.clone())))
    }

    async fn exists(&self, id: UserId) -> Result<bool, RepositoryError> {
        Ok(self.inner.read().await.rows.iter().any(|u| u.user.id == id))
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .rows
            .iter()
            .find(|u| u.user.id == id)
            .map(|u| u.user.clone()))
    }

    async fn delete_by_email(&self, email: &Email) -> Result<bool, RepositoryError> {
        let mut users = self.inner.write().await;
        let before = users.rows.len();
        users.rows.retain(|u| u.user.email != *email);
        Ok(users.rows.len() < before)
    }
}
