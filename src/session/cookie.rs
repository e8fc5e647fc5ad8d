use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::HttpRequest;

use crate::cognito::TokenSet;
use crate::settings::{AppSettings, MAX_SESSION_DURATION_DAYS};

/// Identity token cookie
pub const ID_TOKEN_COOKIE: &str = "jwt";
/// Access token cookie, passed through to the Cognito user API
pub const ACCESS_TOKEN_COOKIE: &str = "at";
/// Refresh token cookie
pub const REFRESH_TOKEN_COOKIE: &str = "rt";

pub const SESSION_COOKIES: [&str; 3] = [ID_TOKEN_COOKIE, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE];

/// Options for cookie creation
pub struct CookieOptions {
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub path: String,
    pub max_age: Duration,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            http_only: true,
            secure: true,
            same_site: SameSite::Strict,
            path: "/".to_string(),
            max_age: Duration::hours(1),
        }
    }
}

/// Builds the session cookies that carry the Cognito token triple
#[derive(Clone)]
pub struct CookieFactory {
    cookie_secure: bool,
    session_duration_days: u64,
}

impl CookieFactory {
    #[must_use]
    pub fn new(cookie_secure: bool, session_duration_days: u64) -> Self {
        Self {
            cookie_secure,
            session_duration_days,
        }
    }

    #[must_use]
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(
            settings.cookies.secure,
            settings.session.session_duration_days,
        )
    }

    pub fn create_cookie(
        &self,
        name: &str,
        value: String,
        options: CookieOptions,
    ) -> Cookie<'static> {
        Cookie::build(name.to_owned(), value)
            .http_only(options.http_only)
            .secure(self.cookie_secure && options.secure)
            .same_site(options.same_site)
            .path(options.path)
            .max_age(options.max_age)
            .finish()
    }

    fn session_max_age(&self) -> Duration {
        let days = self
            .session_duration_days
            .min(MAX_SESSION_DURATION_DAYS);
        Duration::days(i64::try_from(days).unwrap_or(0))
    }

    fn access_token_max_age(tokens: &TokenSet) -> Duration {
        Duration::seconds(i64::try_from(tokens.expires_in).unwrap_or(3600))
    }

    /// Cookies set after a successful code exchange
    #[must_use]
    pub fn session_cookies(&self, tokens: &TokenSet) -> Vec<Cookie<'static>> {
        let mut cookies = vec![
            self.create_cookie(
                ID_TOKEN_COOKIE,
                tokens.id_token.clone(),
                CookieOptions {
                    max_age: self.session_max_age(),
                    ..Default::default()
                },
            ),
            self.create_cookie(
                ACCESS_TOKEN_COOKIE,
                tokens.access_token.clone(),
                CookieOptions {
                    max_age: Self::access_token_max_age(tokens),
                    ..Default::default()
                },
            ),
        ];

        if let Some(refresh_token) = &tokens.refresh_token {
            cookies.push(self.create_cookie(
                REFRESH_TOKEN_COOKIE,
                refresh_token.clone(),
                CookieOptions {
                    max_age: self.session_max_age(),
                    ..Default::default()
                },
            ));
        }

        cookies
    }

    /// Cookies re-issued after a refresh
    ///
    /// Cognito only returns a refresh token here when rotation is enabled, in
    /// which case the `rt` cookie is replaced too.
    #[must_use]
    pub fn refreshed_session_cookies(&self, tokens: &TokenSet) -> Vec<Cookie<'static>> {
        self.session_cookies(tokens)
    }

    /// Expired versions of all three session cookies
    #[must_use]
    pub fn clear_session_cookies(&self) -> Vec<Cookie<'static>> {
        SESSION_COOKIES
            .iter()
            .map(|name| create_expired_cookie(name, self.cookie_secure))
            .collect()
    }
}

/// Create an expired cookie for clearing
#[must_use]
pub fn create_expired_cookie(name: &str, secure: bool) -> Cookie<'static> {
    Cookie::build(name.to_owned(), "")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(Duration::seconds(-1))
        .finish()
}

/// Non-empty value of a request cookie
#[must_use]
pub fn cookie_value(req: &HttpRequest, name: &str) -> Option<String> {
    req.cookie(name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}
