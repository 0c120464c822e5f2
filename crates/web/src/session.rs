//! Server-side sessions.
//!
//! Sessions are [`tower_sessions::Session`] values managed by the layer from
//! [`crate::middleware::session::create_session_layer`]. The layer loads the
//! record lazily on first access and saves it after the handler returns.
//!
//! Records live in any [`SessionStore`]: `PostgresStore` in production,
//! `MemoryStore` in tests. [`SessionBackend`] sits in front of the store and
//! turns load failures into a fresh session.
//!
//! Two in-flight requests carrying the same session id each work on their
//! own copy of the data; whichever saves last wins.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tower_sessions::{
    SessionStore,
    session::{self, Id, Record},
    session_store,
};

pub use tower_sessions::Session;

/// Errors that can occur while reading or writing a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The backing store failed.
    #[error("session store error: {0}")]
    Store(#[from] session_store::Error),

    /// A value could not be converted to or from JSON.
    #[error("session value could not be serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<session::Error> for SessionError {
    fn from(err: session::Error) -> Self {
        match err {
            session::Error::Store(e) => Self::Store(e),
            session::Error::SerdeJson(e) => Self::Serialization(e),
        }
    }
}

/// Shared handle to the configured session store.
///
/// Loading never fails: a store error is logged and reported as a missing
/// record, so the request continues with a fresh session. Writes and
/// deletes pass through unchanged and a failed save answers `500`.
#[derive(Debug, Clone)]
pub struct SessionBackend {
    store: Arc<dyn SessionStore>,
}

impl SessionBackend {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SessionStore for SessionBackend {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        self.store.create(record).await
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.store.save(record).await
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        match self.store.load(session_id).await {
            Ok(record) => Ok(record),
            Err(e) => {
                tracing::warn!(error = %e, "session store load failed, starting a fresh session");
                Ok(None)
            }
        }
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.store.delete(session_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use time::{Duration, OffsetDateTime};
    use tower_sessions::MemoryStore;

    #[derive(Debug)]
    struct UnreachableStore;

    #[async_trait]
    impl SessionStore for UnreachableStore {
        async fn save(&self, _record: &Record) -> session_store::Result<()> {
            Err(session_store::Error::Backend("connection refused".to_string()))
        }

        async fn load(&self, _session_id: &Id) -> session_store::Result<Option<Record>> {
            Err(session_store::Error::Backend("connection refused".to_string()))
        }

        async fn delete(&self, _session_id: &Id) -> session_store::Result<()> {
            Err(session_store::Error::Backend("connection refused".to_string()))
        }
    }

    fn record(expiry_date: OffsetDateTime) -> Record {
        Record {
            id: Id::default(),
            data: HashMap::from([("flash".to_string(), serde_json::json!("hello"))]),
            expiry_date,
        }
    }

    #[tokio::test]
    async fn test_backend_passes_records_through() {
        let backend = SessionBackend::new(Arc::new(MemoryStore::default()));
        let mut live = record(OffsetDateTime::now_utc() + Duration::hours(1));
        backend.create(&mut live).await.unwrap();

        let loaded = backend.load(&live.id).await.unwrap().unwrap();
        assert_eq!(loaded.data, live.data);

        backend.delete(&live.id).await.unwrap();
        assert!(backend.load(&live.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_backend_hides_expired_records() {
        let backend = SessionBackend::new(Arc::new(MemoryStore::default()));
        let mut expired = record(OffsetDateTime::now_utc() - Duration::minutes(1));
        backend.create(&mut expired).await.unwrap();

        assert!(backend.load(&expired.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_backend_load_failure_is_a_missing_record() {
        let backend = SessionBackend::new(Arc::new(UnreachableStore));
        assert!(backend.load(&Id::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_backend_write_failure_propagates() {
        let backend = SessionBackend::new(Arc::new(UnreachableStore));
        let live = record(OffsetDateTime::now_utc() + Duration::hours(1));
        assert!(backend.save(&live).await.is_err());
    }

    #[tokio::test]
    async fn test_remove_reads_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        session.insert("flash", "saved").await.unwrap();

        let first = session.remove::<String>("flash").await.unwrap();
        assert_eq!(first.as_deref(), Some("saved"));
        assert!(session.remove::<String>("flash").await.unwrap().is_none());
    }

    #[test]
    fn test_session_error_from_session_errors() {
        let err = SessionError::from(session::Error::Store(session_store::Error::Backend(
            "down".to_string(),
        )));
        assert!(matches!(err, SessionError::Store(_)));
    }
}
