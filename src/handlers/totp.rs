// TOTP enrollment: AssociateSoftwareToken, VerifySoftwareToken, SetUserMFAPreference
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::require_access_token;
use crate::cognito::VerificationStatus;
use crate::error::AppError;
use crate::models::AccessToken;
use crate::session::SessionManager;
use crate::utils::responses::ResponseBuilder;
use crate::views;

pub const MFA_ALREADY_ENABLED: &str = "MFA is already enabled";
pub const VERIFICATION_FAILED: &str = "Error: Verification failed";

#[derive(Debug, Deserialize)]
pub struct VerifyForm {
    pub code: String,
}

/// Start enrollment, or report that TOTP is already on
///
/// # Errors
/// Returns an error without an access token or if a Cognito call fails
pub async fn setup(
    access_token: Option<web::ReqData<AccessToken>>,
    session_manager: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let access_token = require_access_token(access_token)?;
    let provider = session_manager.provider();

    let user = provider.get_user(&access_token).await?;
    if user.has_totp_enabled() {
        return Ok(ResponseBuilder::html(views::totp_message_page(
            MFA_ALREADY_ENABLED,
        )?));
    }

    let secret = provider.associate_software_token(&access_token).await?;
    Ok(ResponseBuilder::html(views::totp_setup_page(
        &user.totp_provisioning_uri(&secret),
        &secret,
    )?))
}

/// Verify the first code and make TOTP the preferred MFA method
///
/// # Errors
/// Returns 400 if TOTP is already enabled or the code is rejected
pub async fn verify(
    form: web::Form<VerifyForm>,
    access_token: Option<web::ReqData<AccessToken>>,
    session_manager: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let access_token = require_access_token(access_token)?;
    let provider = session_manager.provider();

    let user = provider.get_user(&access_token).await?;
    if user.has_totp_enabled() {
        return Err(AppError::bad_request(MFA_ALREADY_ENABLED));
    }

    let code = form.code.trim();
    if code.is_empty() {
        return Err(AppError::bad_request(VERIFICATION_FAILED));
    }

    match provider.verify_software_token(&access_token, code).await {
        Ok(VerificationStatus::Success) => {}
        Ok(VerificationStatus::Error) => return Err(AppError::bad_request(VERIFICATION_FAILED)),
        Err(e) if e.is_code_rejection() => {
            log::info!("TOTP code rejected for '{}': {e}", user.username);
            return Err(AppError::bad_request(VERIFICATION_FAILED));
        }
        Err(e) => return Err(e.into()),
    }

    provider.enable_software_token_mfa(&access_token).await?;
    log::info!("✅ TOTP MFA enabled for '{}'", user.username);

    Ok(ResponseBuilder::html(views::totp_message_page(
        "MFA has been enabled",
    )?))
}
