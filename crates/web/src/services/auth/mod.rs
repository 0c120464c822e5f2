//! Authentication service.
//!
//! Password registration and login on top of a [`UserStore`].

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use snippetbox_core::{Email, UserId};

use crate::db::{RepositoryError, UserStore};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A structurally valid PHC string that matches no password.
///
/// Verified against when the email is unknown so both failure paths cost
/// one Argon2 run.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c25pcHBldGJveGR1bW15$nWs7C0hXrR1Wj9m1cU8lJ2Ey7Zp0Wq4n4y3fPz2oYxA";

/// Authentication service.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserStore) -> Self {
        Self { users }
    }

    /// Register a new user with name, email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::DuplicateEmail` if the email is already registered.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserId, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let id = self
            .users
            .insert(name.trim(), &email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::DuplicateEmail,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %id, "user registered");
        Ok(id)
    }

    /// Check an email and password pair.
    ///
    /// Unknown emails and wrong passwords produce the same error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<UserId, AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Err(AuthError::InvalidCredentials);
        };

        match self.users.credentials(&email).await? {
            Some((id, password_hash)) => {
                verify_password(password, &password_hash)?;
                Ok(id)
            }
            None => {
                let _ = verify_password(password, DUMMY_HASH);
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Whether the user still exists.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the store cannot be queried.
    pub async fn user_exists(&self, id: UserId) -> Result<bool, AuthError> {
        Ok(self.users.exists(id).await?)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryUserStore;

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let store = MemoryUserStore::new();
        let auth = AuthService::new(&store);

        let id = auth
            .register("Alice", "alice@example.com", "pa55word!")
            .await
            .unwrap();
        let authed = auth
            .authenticate("alice@example.com", "pa55word!")
            .await
            .unwrap();
        assert_eq!(id, authed);
        assert!(auth.user_exists(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let store = MemoryUserStore::new();
        let auth = AuthService::new(&store);

        auth.register("Alice", "alice@example.com", "pa55word!")
            .await
            .unwrap();
        let err = auth
            .register("Other", "alice@example.com", "different1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn test_register_rejects_short_password() {
        let store = MemoryUserStore::new();
        let auth = AuthService::new(&store);

        let err = auth
            .register("Alice", "alice@example.com", "short")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(_)));
    }

    #[tokio::test]
    async fn test_authenticate_failures_are_indistinguishable() {
        let store = MemoryUserStore::new();
        let auth = AuthService::new(&store);
        auth.register("Alice", "alice@example.com", "pa55word!")
            .await
            .unwrap();

        let wrong_password = auth
            .authenticate("alice@example.com", "wrong-password")
            .await
            .unwrap_err();
        let unknown_email = auth
            .authenticate("nobody@example.com", "pa55word!")
            .await
            .unwrap_err();
        let malformed = auth.authenticate("not-an-email", "pa55word!").await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert!(matches!(malformed, AuthError::InvalidCredentials));
    }

    #[test]
    fn test_hash_is_not_plaintext() {
        let hash = hash_password("pa55word!").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("pa55word!", &hash).is_ok());
        assert!(verify_password("nope", &hash).is_err());
    }
}
