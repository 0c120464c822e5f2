//! Data shared by every rendered page.

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{DateTime, Datelike, Utc};

use crate::error::AppError;
use crate::middleware::{AuthContext, CsrfToken};
use crate::models::{Snippet, session_keys};
use crate::session::Session;
use crate::state::AppState;

/// Layout data every page template receives.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// One-shot message from the previous request.
    pub flash: Option<String>,
    pub is_authenticated: bool,
    /// Value for the hidden CSRF form field.
    pub csrf_token: String,
    /// Name of the hidden CSRF form field.
    pub csrf_field: String,
    pub current_year: i32,
}

/// Extractor gathering what a page needs from the request pipeline.
///
/// Only available on dynamic and protected routes.
#[derive(Debug, Clone)]
pub struct ViewContext {
    session: Session,
    auth: AuthContext,
    csrf_token: CsrfToken,
    csrf_field: String,
}

impl ViewContext {
    /// The request's session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// The request's authentication context.
    #[must_use]
    pub const fn auth(&self) -> AuthContext {
        self.auth
    }

    /// Build the layout data, consuming any pending flash message.
    pub async fn page(&self) -> Page {
        let flash = self
            .session
            .remove::<String>(session_keys::FLASH)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "dropping unreadable flash message"))
            .ok()
            .flatten();

        Page {
            flash,
            is_authenticated: self.auth.is_authenticated(),
            csrf_token: self.csrf_token.as_str().to_owned(),
            csrf_field: self.csrf_field.clone(),
            current_year: Utc::now().year(),
        }
    }
}

impl FromRequestParts<AppState> for ViewContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session used on a route without one".to_string()))?;
        let csrf_token = CsrfToken::from_request_parts(parts, state).await?;
        let auth = parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .unwrap_or_default();

        Ok(Self {
            session,
            auth,
            csrf_token,
            csrf_field: state.config().csrf_field.clone(),
        })
    }
}

/// Format a timestamp as e.g. `17 Mar 2026 at 10:15` (UTC).
#[must_use]
pub fn human_date(t: DateTime<Utc>) -> String {
    t.format("%d %b %Y at %H:%M").to_string()
}

/// A snippet prepared for display.
#[derive(Debug, Clone)]
pub struct SnippetView {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub created: String,
    pub expires: String,
}

impl From<&Snippet> for SnippetView {
    fn from(snippet: &Snippet) -> Self {
        Self {
            id: snippet.id.as_i32(),
            title: snippet.title.clone(),
            content: snippet.content.clone(),
            created: human_date(snippet.created),
            expires: human_date(snippet.expires),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeZone;
    use tower_sessions::MemoryStore;

    #[test]
    fn test_human_date() {
        let t = Utc.with_ymd_and_hms(2026, 3, 17, 10, 15, 0).unwrap();
        assert_eq!(human_date(t), "17 Mar 2026 at 10:15");
    }

    #[tokio::test]
    async fn test_page_consumes_flash() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        session
            .insert(session_keys::FLASH, "Snippet successfully created!")
            .await
            .unwrap();
        let view = ViewContext {
            session: session.clone(),
            auth: AuthContext::anonymous(),
            csrf_token: CsrfToken("t".to_string()),
            csrf_field: "csrf_token".to_string(),
        };

        let first = view.page().await;
        assert_eq!(first.flash.as_deref(), Some("Snippet successfully created!"));
        assert_eq!(first.csrf_token, "t");
        assert!(view.page().await.flash.is_none());
        let left: Option<String> = session.get(session_keys::FLASH).await.unwrap();
        assert!(left.is_none());
    }
}
