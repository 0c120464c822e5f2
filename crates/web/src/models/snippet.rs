//! Snippet domain types.

use chrono::{DateTime, Utc};

use snippetbox_core::SnippetId;

/// A stored text snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    /// Unique snippet ID.
    pub id: SnippetId,
    /// Short title shown in listings.
    pub title: String,
    /// Snippet body.
    pub content: String,
    /// When the snippet was created.
    pub created: DateTime<Utc>,
    /// When the snippet stops being visible.
    pub expires: DateTime<Utc>,
}

impl Snippet {
    /// Whether the snippet is still visible at `now`.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires > now
    }
}

/// Input for creating a snippet.
#[derive(Debug, Clone)]
pub struct NewSnippet {
    pub title: String,
    pub content: String,
    /// Lifetime in days, counted from creation.
    pub expires_days: u32,
}
