//! Links embedded in transactional emails.

/// Path of the account activation page.
pub const ACTIVATE_ACCOUNT_PATH: &str = "/activate-account";

/// Path of the reset password page linked from administrator-initiated resets.
pub const RESET_PASSWORD_PATH: &str = "/reset-password";

/// Path of the reset password page linked from forgot-password requests.
pub const FORGOT_PASSWORD_RESET_PATH: &str = "/Account/ResetPassword";

/// Strips trailing slashes so paths can be appended directly.
pub fn normalize_base_url(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}

/// Builds `{base_url}{path}?token={token}`.
pub fn token_link(base_url: &str, path: &str, token: &str) -> String {
    format!("{}{}?token={}", normalize_base_url(base_url), path, token)
}
