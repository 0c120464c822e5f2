//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};

use snippetbox_core::{Email, UserId};

/// A registered user (domain type).
///
/// The password hash never leaves the user store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// User's email address (unique).
    pub email: Email,
    /// When the user signed up.
    pub created: DateTime<Utc>,
}
