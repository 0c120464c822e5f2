//! User management commands.

use snippetbox_core::{Email, UserId};
use snippetbox_web::db::{PgUserStore, UserStore};
use snippetbox_web::services::auth::AuthService;

use super::{CliError, connect};

/// Create a user with a password.
///
/// # Returns
///
/// The ID of the created user.
pub async fn create(name: &str, email: &str, password: &str) -> Result<UserId, CliError> {
    let pool = connect().await?;
    let users = PgUserStore::new(pool);

    let user_id = AuthService::new(&users)
        .register(name, email, password)
        .await?;

    tracing::info!("User created successfully! ID: {}, Email: {}", user_id, email);
    Ok(user_id)
}

/// Delete a user by email.
///
/// Sessions that still carry the user's id fall back to anonymous on their
/// next request.
pub async fn delete(email: &str) -> Result<(), CliError> {
    let email = Email::parse(email)?;
    let pool = connect().await?;
    let users = PgUserStore::new(pool);

    if !users.delete_by_email(&email).await? {
        return Err(CliError::UnknownUser(email.into_inner()));
    }

    tracing::info!("User deleted: {}", email);
    Ok(())
}
