use actix_web::{web, HttpResponse};

use crate::cognito::IdentityTokenClaims;
use crate::error::AppError;
use crate::models::{HealthResponse, Principal};
use crate::utils::responses::ResponseBuilder;
use crate::views;

/// Home page with the caller's decoded identity token
///
/// # Errors
/// Returns an error if the claims cannot be serialized
pub async fn index(
    principal: web::ReqData<Principal>,
    claims: web::ReqData<IdentityTokenClaims>,
) -> Result<HttpResponse, AppError> {
    let claims_json = serde_json::to_string_pretty(&claims.into_inner())
        .map_err(|e| AppError::upstream("Failed to render token.", e))?;
    Ok(ResponseBuilder::html(views::index_page(
        &principal,
        &claims_json,
    )?))
}

/// Not-authorized page
///
/// # Errors
/// Returns an error if the page fails to render
pub async fn oops() -> Result<HttpResponse, AppError> {
    Ok(ResponseBuilder::html(views::oops_page()?))
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        version: crate::VERSION,
    })
}
