//! URLs of the Cognito hosted UI

use anyhow::{Context, Result};
use url::Url;

use crate::settings::CognitoSettings;

/// Hosted login page for the authorization-code flow
///
/// # Errors
///
/// Returns an error if the configured auth domain is not a valid URL
pub fn login_url(settings: &CognitoSettings) -> Result<String> {
    let mut url = endpoint(settings, "login")?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &settings.client_id)
        .append_pair("redirect_uri", &settings.redirect_uri)
        .append_pair("scope", &settings.scope_string());
    Ok(url.into())
}

/// Hosted logout endpoint, which ends the IdP session and bounces back to `logout_redirect_uri`
///
/// # Errors
///
/// Returns an error if the configured auth domain is not a valid URL
pub fn logout_url(settings: &CognitoSettings) -> Result<String> {
    let mut url = endpoint(settings, "logout")?;
    url.query_pairs_mut()
        .append_pair("client_id", &settings.client_id)
        .append_pair("logout_uri", &settings.logout_redirect_uri);
    Ok(url.into())
}

fn endpoint(settings: &CognitoSettings, path: &str) -> Result<Url> {
    let base = settings.auth_domain.trim_end_matches('/');
    Url::parse(&format!("{base}/{path}"))
        .with_context(|| format!("Invalid Cognito auth domain: {}", settings.auth_domain))
}
