// Login, callback and logout handlers
use actix_web::{http::StatusCode, web, HttpResponse};
use serde::Deserialize;

use crate::cognito::hosted_ui;
use crate::error::AppError;
use crate::session::SessionManager;
use crate::settings::AppSettings;
use crate::utils::logging::LoggingHelper;
use crate::utils::responses::ResponseBuilder;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Redirect to the hosted login page
///
/// # Errors
/// Returns an error if the login URL cannot be built from the configured domain
pub async fn login(settings: web::Data<AppSettings>) -> Result<HttpResponse, AppError> {
    let url = hosted_ui::login_url(&settings.cognito)
        .map_err(|e| AppError::upstream("Login is not available.", e))?;
    Ok(ResponseBuilder::redirect(&url, Vec::new()))
}

/// Exchange the authorization code and establish the session cookies
///
/// # Errors
/// Returns 400 without a code and 500 if the code exchange fails
pub async fn callback(
    query: web::Query<CallbackQuery>,
    session_manager: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let code = query
        .code
        .as_deref()
        .filter(|code| !code.is_empty())
        .ok_or_else(|| {
            if let Some(error) = &query.error {
                log::warn!(
                    "Hosted UI returned error '{error}': {}",
                    query.error_description.as_deref().unwrap_or("")
                );
            }
            AppError::bad_request("Invalid request: No code provided.")
        })?;

    LoggingHelper::log_token_exchange_start();
    let tokens = session_manager
        .provider()
        .exchange_code(code)
        .await
        .map_err(|e| {
            LoggingHelper::log_token_exchange_failed(&e);
            AppError::upstream("Failed to exchange authorization code.", e)
        })?;
    LoggingHelper::log_token_exchange_success(&tokens);

    let cookies = session_manager.cookie_factory().session_cookies(&tokens);
    Ok(ResponseBuilder::redirect("/", cookies))
}

/// Clear the session cookies and end the hosted UI session
///
/// # Errors
/// Returns an error if the logout URL cannot be built from the configured domain
pub async fn logout(
    settings: web::Data<AppSettings>,
    session_manager: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let url = hosted_ui::logout_url(&settings.cognito)
        .map_err(|e| AppError::upstream("Logout is not available.", e))?;

    LoggingHelper::log_logout();
    Ok(ResponseBuilder::redirect(
        &url,
        session_manager.cookie_factory().clear_session_cookies(),
    ))
}

/// Landing page after the hosted UI logout
pub async fn logged_out() -> HttpResponse {
    ResponseBuilder::plain_text(StatusCode::OK, "you're out")
}
