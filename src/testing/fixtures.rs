//! Test fixtures providing pre-built test objects

use std::sync::Arc;

use actix_web::cookie::Cookie;

use super::constants::{
    TEST_ACCESS_TOKEN, TEST_AUTH_DOMAIN, TEST_CLIENT_ID, TEST_LOGOUT_REDIRECT_URI,
    TEST_REDIRECT_URI, TEST_REFRESH_TOKEN, TEST_USER_POOL_ID,
};
use super::MockIdentityProvider;
use crate::cognito::{IdentityProvider, JwtValidator};
use crate::session::cookie::{ACCESS_TOKEN_COOKIE, ID_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::session::{CookieFactory, SessionManager};
use crate::settings::{AppSettings, CognitoSettings};

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Cognito settings for the test user pool (region derived from the pool id)
    #[must_use]
    pub fn cognito_settings() -> CognitoSettings {
        CognitoSettings {
            client_id: TEST_CLIENT_ID.to_string(),
            client_secret: None,
            auth_domain: TEST_AUTH_DOMAIN.to_string(),
            redirect_uri: TEST_REDIRECT_URI.to_string(),
            logout_redirect_uri: TEST_LOGOUT_REDIRECT_URI.to_string(),
            user_pool_id: TEST_USER_POOL_ID.to_string(),
            ..CognitoSettings::default()
        }
    }

    #[must_use]
    pub fn settings() -> AppSettings {
        AppSettings {
            cognito: Self::cognito_settings(),
            ..AppSettings::default()
        }
    }

    /// Session manager backed by the given provider
    #[must_use]
    pub fn session_manager(provider: Arc<MockIdentityProvider>) -> SessionManager {
        let settings = Self::settings();
        let provider: Arc<dyn IdentityProvider> = provider;
        SessionManager::new(
            provider,
            JwtValidator::from_settings(&settings),
            CookieFactory::from_settings(&settings),
        )
    }

    /// The three session cookies a browser would send after login
    #[must_use]
    pub fn session_cookies(id_token: &str) -> Vec<Cookie<'static>> {
        vec![
            Cookie::new(ID_TOKEN_COOKIE, id_token.to_string()),
            Cookie::new(ACCESS_TOKEN_COOKIE, TEST_ACCESS_TOKEN),
            Cookie::new(REFRESH_TOKEN_COOKIE, TEST_REFRESH_TOKEN),
        ]
    }
}
