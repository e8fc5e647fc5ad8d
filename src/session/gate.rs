//! Route gating middleware
//!
//! Every route is protected unless listed in [`PUBLIC_PATHS`]. Protected
//! requests get their [`Principal`], identity claims and [`AccessToken`]
//! stored in the request extensions; unauthenticated ones are redirected to
//! `/oops`.

use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::{web, Error, HttpMessage};

use crate::models::AccessToken;
use crate::session::SessionManager;
use crate::utils::logging::LoggingHelper;
use crate::utils::responses::ResponseBuilder;

/// Routes reachable without a session
pub const PUBLIC_PATHS: &[&str] = &[
    "/login",
    "/callback",
    "/logout",
    "/loggedout",
    "/oops",
    "/health",
];

/// Where unauthenticated requests are sent
pub const NOT_AUTHORIZED_PATH: &str = "/oops";

#[must_use]
pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

/// Authenticate protected requests before they reach a handler
///
/// # Errors
///
/// Returns an error if the wrapped service fails or a refreshed cookie cannot be
/// added to the response
pub async fn session_gate<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<BoxBody>, Error>
where
    B: MessageBody + 'static,
{
    if is_public_path(req.path()) {
        return next.call(req).await.map(ServiceResponse::map_into_boxed_body);
    }

    let Some(manager) = req.app_data::<web::Data<SessionManager>>().cloned() else {
        log::error!("SessionManager is not registered as app data");
        return Ok(req.into_response(ResponseBuilder::internal_server_error()));
    };

    let authenticated = match manager.authenticate(req.request()).await {
        Ok(authenticated) => authenticated,
        Err(e) => {
            LoggingHelper::log_unauthorized(req.path(), &e);
            return Ok(req.into_response(ResponseBuilder::redirect(NOT_AUTHORIZED_PATH, Vec::new())));
        }
    };

    {
        let mut extensions = req.extensions_mut();
        extensions.insert(authenticated.principal);
        extensions.insert(authenticated.claims);
        if let Some(access_token) = authenticated.access_token {
            extensions.insert(AccessToken(access_token));
        }
    }

    let mut res = next.call(req).await?;
    // Cookies set by the handler itself are newer than the gate's
    let handler_set: Vec<String> = res
        .response()
        .cookies()
        .map(|cookie| cookie.name().to_string())
        .collect();
    for cookie in &authenticated.refreshed_cookies {
        if !handler_set.iter().any(|name| name == cookie.name()) {
            res.response_mut().add_cookie(cookie)?;
        }
    }

    Ok(res.map_into_boxed_body())
}
