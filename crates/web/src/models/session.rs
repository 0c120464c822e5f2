//! Session-related types.

/// Keys under which values are stored in a session.
pub mod keys {
    /// Id of the logged-in user.
    pub const AUTHENTICATED_USER_ID: &str = "authenticated_user_id";

    /// One-shot message shown on the next rendered page.
    pub const FLASH: &str = "flash";

    /// Anti-forgery token embedded in every form.
    pub const CSRF_TOKEN: &str = "csrf_token";

    /// Path a visitor asked for before being sent to the login page.
    pub const REDIRECT_AFTER_LOGIN: &str = "redirect_after_login";
}
