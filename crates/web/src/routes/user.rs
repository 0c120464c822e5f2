//! Signup, login, logout and account handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::error::{AppError, Result};
use crate::forms::{UserLoginForm, UserSignupForm};
use crate::middleware::{LOGIN_PATH, csrf};
use crate::models::session_keys;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;
use crate::views::{Page, ViewContext, human_date};

const SIGNUP_FLASH: &str = "Your signup was successful. Please log in.";
const LOGOUT_FLASH: &str = "You've been logged out successfully!";
const DUPLICATE_EMAIL: &str = "Email address is already in use";
const BAD_CREDENTIALS: &str = "Email or password is incorrect";

// =============================================================================
// Templates
// =============================================================================

/// Signup page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/signup.html")]
pub struct SignupTemplate {
    pub page: Page,
    pub form: UserSignupForm,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub page: Page,
    pub form: UserLoginForm,
}

/// Account page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/account.html")]
pub struct AccountTemplate {
    pub page: Page,
    pub name: String,
    pub email: String,
    pub joined: String,
}

fn decode<T>(form: std::result::Result<Form<T>, FormRejection>) -> Result<T> {
    form.map(|Form(inner)| inner)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

/// Only same-site absolute paths are followed after login.
fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}

// =============================================================================
// Signup
// =============================================================================

/// Display the signup page.
pub async fn signup_form(view: ViewContext) -> SignupTemplate {
    SignupTemplate {
        page: view.page().await,
        form: UserSignupForm::default(),
    }
}

/// Handle signup form submission.
pub async fn signup(
    State(state): State<AppState>,
    view: ViewContext,
    form: std::result::Result<Form<UserSignupForm>, FormRejection>,
) -> Result<Response> {
    let mut form = decode(form)?;

    if form.validate() {
        let auth = AuthService::new(state.users());
        match auth.register(&form.name, &form.email, &form.password).await {
            Ok(_) => {
                view.session()
                    .insert(session_keys::FLASH, SIGNUP_FLASH)
                    .await?;
                return Ok(Redirect::to(LOGIN_PATH).into_response());
            }
            Err(AuthError::DuplicateEmail) => {
                form.errors.add_field_error("email", DUPLICATE_EMAIL);
            }
            Err(e) => return Err(e.into()),
        }
    }

    form.password.clear();
    Ok((
        StatusCode::UNPROCESSABLE_ENTITY,
        SignupTemplate {
            page: view.page().await,
            form,
        },
    )
        .into_response())
}

// =============================================================================
// Login / Logout
// =============================================================================

/// Display the login page.
pub async fn login_form(view: ViewContext) -> LoginTemplate {
    LoginTemplate {
        page: view.page().await,
        form: UserLoginForm::default(),
    }
}

/// Handle login form submission.
///
/// On success the session moves to a new id, records the user, gets a new
/// CSRF token and the visitor is sent back to the page the gate stopped
/// them at, or home.
pub async fn login(
    State(state): State<AppState>,
    view: ViewContext,
    form: std::result::Result<Form<UserLoginForm>, FormRejection>,
) -> Result<Response> {
    let mut form = decode(form)?;

    if form.validate() {
        let auth = AuthService::new(state.users());
        match auth.authenticate(&form.email, &form.password).await {
            Ok(user_id) => {
                let session = view.session();
                session.cycle_id().await?;
                session
                    .insert(session_keys::AUTHENTICATED_USER_ID, user_id)
                    .await?;
                csrf::rotate_token(session).await?;

                let target = session
                    .remove::<String>(session_keys::REDIRECT_AFTER_LOGIN)
                    .await?
                    .filter(|path| is_local_path(path))
                    .unwrap_or_else(|| "/".to_owned());

                tracing::info!(%user_id, "user logged in");
                return Ok(Redirect::to(&target).into_response());
            }
            Err(AuthError::InvalidCredentials) => {
                form.errors.add_non_field_error(BAD_CREDENTIALS);
            }
            Err(e) => return Err(e.into()),
        }
    }

    form.password.clear();
    Ok((
        StatusCode::UNPROCESSABLE_ENTITY,
        LoginTemplate {
            page: view.page().await,
            form,
        },
    )
        .into_response())
}

/// Log out: drop the session and start a fresh one carrying a flash.
///
/// The old record is deleted, so its cookie no longer resolves.
pub async fn logout(view: ViewContext) -> Result<Redirect> {
    let session = view.session();
    if let Some(user_id) = view.auth().user_id() {
        tracing::info!(%user_id, "user logged out");
    }
    session.clear().await;
    session.cycle_id().await?;
    session.insert(session_keys::FLASH, LOGOUT_FLASH).await?;
    sentry::configure_scope(|scope| scope.set_user(None));

    Ok(Redirect::to("/"))
}

// =============================================================================
// Account
// =============================================================================

/// Display the current user's account details.
pub async fn account(State(state): State<AppState>, view: ViewContext) -> Result<AccountTemplate> {
    let user_id = view
        .auth()
        .user_id()
        .ok_or_else(|| AppError::Unauthorized("account page without a user".to_string()))?;
    let user = state
        .users()
        .get(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;

    Ok(AccountTemplate {
        page: view.page().await,
        name: user.name,
        email: user.email.into_inner(),
        joined: human_date(user.created),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_local_path() {
        assert!(is_local_path("/snippet/create"));
        assert!(is_local_path("/snippet/view/1?x=y"));
        assert!(!is_local_path("//evil.example.com"));
        assert!(!is_local_path("https://evil.example.com"));
        assert!(!is_local_path("/\\evil.example.com"));
    }
}
