//! Session Manager - cookie-carried Cognito sessions
//!
//! There is no server-side session store. A request is authenticated by
//! verifying the identity token in the `jwt` cookie; an identity token whose
//! only defect is expiry is replaced through a single refresh-token grant.

use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::HttpRequest;

use crate::cognito::{
    IdentityProvider, IdentityTokenClaims, JwtValidationError, JwtValidator, ProviderError,
    TokenSet,
};
use crate::models::Principal;
use crate::session::cookie::{
    cookie_value, CookieFactory, ACCESS_TOKEN_COOKIE, ID_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
use crate::utils::logging::LoggingHelper;

/// Reasons a request is not authenticated
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No identity token cookie")]
    MissingSession,

    #[error("Identity token expired and no refresh token cookie")]
    MissingRefreshToken,

    #[error("Identity token rejected: {0}")]
    InvalidToken(#[source] JwtValidationError),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(#[source] ProviderError),
}

/// Outcome of a successful authentication
#[derive(Debug)]
pub struct Authenticated {
    pub principal: Principal,
    pub claims: IdentityTokenClaims,
    /// Access token for the user API, absent when the `at` cookie is gone
    pub access_token: Option<String>,
    /// Cookies to set on the response when the session was refreshed
    pub refreshed_cookies: Vec<Cookie<'static>>,
}

impl Authenticated {
    #[must_use]
    pub fn was_refreshed(&self) -> bool {
        !self.refreshed_cookies.is_empty()
    }
}

#[derive(Clone)]
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    validator: JwtValidator,
    cookie_factory: CookieFactory,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        validator: JwtValidator,
        cookie_factory: CookieFactory,
    ) -> Self {
        Self {
            provider,
            validator,
            cookie_factory,
        }
    }

    #[must_use]
    pub fn provider(&self) -> &dyn IdentityProvider {
        self.provider.as_ref()
    }

    #[must_use]
    pub fn cookie_factory(&self) -> &CookieFactory {
        &self.cookie_factory
    }

    /// Authenticate a request from its session cookies
    ///
    /// # Errors
    ///
    /// Returns an error if there is no identity token, the token fails
    /// verification, or an expired token cannot be refreshed
    pub async fn authenticate(&self, req: &HttpRequest) -> Result<Authenticated, AuthError> {
        let id_token = cookie_value(req, ID_TOKEN_COOKIE).ok_or(AuthError::MissingSession)?;

        match self
            .validator
            .validate_id_token(&id_token, self.provider())
            .await
        {
            Ok(claims) => Ok(Authenticated {
                principal: Principal::from(&claims),
                claims,
                access_token: cookie_value(req, ACCESS_TOKEN_COOKIE),
                refreshed_cookies: Vec::new(),
            }),
            Err(JwtValidationError::TokenExpired) => self.refresh_session(req).await,
            Err(e) => Err(AuthError::InvalidToken(e)),
        }
    }

    /// Replace an expired identity token using the `rt` cookie
    async fn refresh_session(&self, req: &HttpRequest) -> Result<Authenticated, AuthError> {
        let refresh_token =
            cookie_value(req, REFRESH_TOKEN_COOKIE).ok_or(AuthError::MissingRefreshToken)?;

        let tokens = self.refresh_tokens(&refresh_token).await?;

        // The refreshed token gets the same scrutiny; it is never refreshed again
        let claims = self
            .validator
            .validate_id_token(&tokens.id_token, self.provider())
            .await
            .map_err(AuthError::InvalidToken)?;

        let principal = Principal::from(&claims);
        LoggingHelper::log_session_refreshed(&principal.username);

        Ok(Authenticated {
            principal,
            claims,
            refreshed_cookies: self.cookie_factory.refreshed_session_cookies(&tokens),
            access_token: Some(tokens.access_token),
        })
    }

    /// One refresh-token grant, logged
    ///
    /// # Errors
    ///
    /// Returns an error if the token endpoint rejects the refresh token
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenSet, AuthError> {
        self.provider
            .refresh_tokens(refresh_token)
            .await
            .map_err(|e| {
                LoggingHelper::log_refresh_failed(&e);
                AuthError::RefreshFailed(e)
            })
    }

    /// Refresh the session cookies on demand, e.g. after the user's attributes changed
    ///
    /// # Errors
    ///
    /// Returns an error if there is no `rt` cookie or the refresh fails
    pub async fn reissue_session_cookies(
        &self,
        req: &HttpRequest,
    ) -> Result<Vec<Cookie<'static>>, AuthError> {
        let refresh_token =
            cookie_value(req, REFRESH_TOKEN_COOKIE).ok_or(AuthError::MissingRefreshToken)?;
        let tokens = self.refresh_tokens(&refresh_token).await?;
        Ok(self.cookie_factory.refreshed_session_cookies(&tokens))
    }
}
