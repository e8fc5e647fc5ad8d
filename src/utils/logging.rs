// Centralized logging for the login flow
// Token values are never logged, only their presence
use log::{debug, error, info, warn};

use crate::cognito::{ProviderError, TokenSet};
use crate::session::AuthError;
use crate::settings::AppSettings;

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log the effective configuration at startup
    pub fn log_startup(settings: &AppSettings) {
        let cognito = &settings.cognito;
        info!(
            "🚀 Starting cognito-gate on http://{}",
            settings.get_bind_address()
        );
        info!(
            "🔧 User pool {} ({}), client {}",
            cognito.user_pool_id,
            cognito.region().unwrap_or("unknown region"),
            cognito.client_id
        );
        info!("🔧 Hosted UI domain: {}", cognito.auth_domain);
        info!(
            "🍪 Session duration: {} days, secure cookies: {}",
            settings.session.session_duration_days, settings.cookies.secure
        );
        if cognito.client_secret.is_some() {
            info!("🔐 Token endpoint uses client secret authentication");
        }
    }

    pub fn log_token_exchange_start() {
        info!("🔄 Exchanging authorization code for tokens");
    }

    /// Summarize a token response without exposing the tokens
    pub fn log_token_exchange_success(tokens: &TokenSet) {
        info!("=== Token Exchange Success ===");
        info!("Token type: {}", tokens.token_type);
        info!("Access token expires in: {}s", tokens.expires_in);
        info!("Refresh token present: {}", tokens.refresh_token.is_some());
        info!("=== End Token Exchange ===");
    }

    pub fn log_token_exchange_failed(err: &ProviderError) {
        error!("❌ Authorization code exchange failed: {err}");
    }

    pub fn log_session_refreshed(username: &str) {
        info!("🔄 Refreshed expired session for '{username}'");
    }

    pub fn log_refresh_failed(err: &ProviderError) {
        warn!("⚠️ Token refresh failed: {err}");
    }

    pub fn log_unauthorized(path: &str, reason: &AuthError) {
        match reason {
            AuthError::MissingSession => debug!("🔒 No session for {path}, redirecting"),
            _ => info!("🔒 Rejected session for {path}: {reason}"),
        }
    }

    pub fn log_logout() {
        info!("👋 Clearing session cookies and redirecting to hosted logout");
    }

    pub fn log_upstream_error(context: &str, cause: &str) {
        error!("❌ {context}: {cause}");
    }
}
