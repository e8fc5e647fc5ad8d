//! Route table and service wiring

use std::sync::Arc;

use actix_web::middleware::from_fn;
use actix_web::web;

use crate::cognito::{CognitoClient, IdentityProvider, JwtValidator};
use crate::handlers;
use crate::session::{session_gate, CookieFactory, SessionManager};
use crate::settings::AppSettings;

/// Register every route behind the session gate
///
/// The gate lets the public paths through; everything else needs a session.
/// Expects `web::Data<AppSettings>` and `web::Data<SessionManager>` as app data.
pub fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("")
            .wrap(from_fn(session_gate))
            .route("/", web::get().to(handlers::index))
            .route("/login", web::get().to(handlers::login))
            .route("/callback", web::get().to(handlers::callback))
            .route("/logout", web::get().to(handlers::logout))
            .route("/loggedout", web::get().to(handlers::logged_out))
            .route("/oops", web::get().to(handlers::oops))
            .route("/health", web::get().to(handlers::health))
            .route("/profile", web::get().to(handlers::show_profile))
            .route("/profile", web::post().to(handlers::update_profile))
            .route("/totp/setup", web::get().to(handlers::totp_setup))
            .route("/totp/verify", web::post().to(handlers::totp_verify)),
    );
}

/// Session manager talking to the configured Cognito user pool
#[must_use]
pub fn build_session_manager(settings: &AppSettings) -> SessionManager {
    let provider: Arc<dyn IdentityProvider> =
        Arc::new(CognitoClient::new(settings.cognito.clone()));
    SessionManager::new(
        provider,
        JwtValidator::from_settings(settings),
        CookieFactory::from_settings(settings),
    )
}
