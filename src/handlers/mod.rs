// HTTP request handlers
pub mod auth;
pub mod pages;
pub mod profile;
pub mod totp;

#[cfg(test)]
mod tests;

use actix_web::web;

use crate::error::AppError;
use crate::models::AccessToken;

// Re-export the main handler functions
pub use auth::{callback, logged_out, login, logout};
pub use pages::{health, index, oops};
pub use profile::{show_profile, update_profile};
pub use totp::{setup as totp_setup, verify as totp_verify};

/// Access token stored by the session gate, required by the user API pages
fn require_access_token(token: Option<web::ReqData<AccessToken>>) -> Result<String, AppError> {
    token
        .map(|token| token.into_inner().0)
        .ok_or(AppError::Unauthorized)
}
