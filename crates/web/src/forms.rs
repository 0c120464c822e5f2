//! HTML form input and validation.
//!
//! Forms deserialize every field as a string so a half-filled form can be
//! redisplayed as typed, with messages next to the offending fields.

use std::collections::BTreeMap;

use serde::Deserialize;

use snippetbox_core::Email;

use crate::services::auth::MIN_PASSWORD_LENGTH;

/// Longest accepted snippet title, in characters.
pub const MAX_TITLE_CHARS: usize = 100;

/// Snippet lifetimes offered on the create form, in days.
pub const PERMITTED_EXPIRY_DAYS: [u32; 3] = [1, 7, 365];

/// Validation messages collected while checking a form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validator {
    field_errors: BTreeMap<String, String>,
    non_field_errors: Vec<String>,
}

impl Validator {
    /// Whether no check has failed.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.field_errors.is_empty() && self.non_field_errors.is_empty()
    }

    /// Record `message` for `field` unless `ok`. Keeps the first message per field.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_field_error(field, message);
        }
    }

    /// Record a message for a field. Keeps the first message per field.
    pub fn add_field_error(&mut self, field: &str, message: &str) {
        self.field_errors
            .entry(field.to_owned())
            .or_insert_with(|| message.to_owned());
    }

    /// Record a message that belongs to the form as a whole.
    pub fn add_non_field_error(&mut self, message: &str) {
        self.non_field_errors.push(message.to_owned());
    }

    /// Message recorded for a field, if any.
    #[must_use]
    pub fn field(&self, field: &str) -> Option<&str> {
        self.field_errors.get(field).map(String::as_str)
    }

    /// Messages that belong to the form as a whole.
    #[must_use]
    pub fn non_field_errors(&self) -> &[String] {
        &self.non_field_errors
    }
}

/// Whether the value has non-whitespace content.
#[must_use]
pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Whether the value has at most `n` characters.
#[must_use]
pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

/// Whether the value has at least `n` characters.
#[must_use]
pub fn min_chars(value: &str, n: usize) -> bool {
    value.chars().count() >= n
}

/// `POST /snippet/create`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnippetCreateForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub expires: String,
    #[serde(skip)]
    pub errors: Validator,
}

impl SnippetCreateForm {
    /// Empty form with the longest lifetime preselected.
    #[must_use]
    pub fn blank() -> Self {
        Self {
            expires: "365".to_owned(),
            ..Self::default()
        }
    }

    /// Whether `days` is the selected lifetime.
    #[must_use]
    pub fn expires_is(&self, days: &str) -> bool {
        self.expires == days
    }

    /// Check the input; on success returns the lifetime in days.
    pub fn validate(&mut self) -> Option<u32> {
        self.errors
            .check(not_blank(&self.title), "title", "This field cannot be blank");
        self.errors.check(
            max_chars(&self.title, MAX_TITLE_CHARS),
            "title",
            "This field cannot be more than 100 characters long",
        );
        self.errors
            .check(not_blank(&self.content), "content", "This field cannot be blank");

        let days = self
            .expires
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|d| PERMITTED_EXPIRY_DAYS.contains(d));
        self.errors
            .check(days.is_some(), "expires", "This field must equal 1, 7 or 365");

        days.filter(|_| self.errors.valid())
    }
}

/// `POST /user/signup`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserSignupForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(skip)]
    pub errors: Validator,
}

impl UserSignupForm {
    /// Check the input. Returns `true` when every field is acceptable.
    pub fn validate(&mut self) -> bool {
        self.errors
            .check(not_blank(&self.name), "name", "This field cannot be blank");
        self.errors
            .check(not_blank(&self.email), "email", "This field cannot be blank");
        self.errors.check(
            Email::parse(&self.email).is_ok(),
            "email",
            "This field must be a valid email address",
        );
        self.errors
            .check(not_blank(&self.password), "password", "This field cannot be blank");
        self.errors.check(
            min_chars(&self.password, MIN_PASSWORD_LENGTH),
            "password",
            "This field must be at least 8 characters long",
        );
        self.errors.valid()
    }
}

/// `POST /user/login`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserLoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(skip)]
    pub errors: Validator,
}

impl UserLoginForm {
    /// Check the input. Returns `true` when both fields are present.
    pub fn validate(&mut self) -> bool {
        self.errors
            .check(not_blank(&self.email), "email", "This field cannot be blank");
        self.errors.check(
            Email::parse(&self.email).is_ok(),
            "email",
            "This field must be a valid email address",
        );
        self.errors
            .check(not_blank(&self.password), "password", "This field cannot be blank");
        self.errors.valid()
    }
}
