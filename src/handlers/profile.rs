// Profile page: GetUser / UpdateUserAttributes with the caller's access token
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use super::require_access_token;
use crate::cognito::UserAttribute;
use crate::error::AppError;
use crate::models::AccessToken;
use crate::session::SessionManager;
use crate::utils::responses::ResponseBuilder;
use crate::views;

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub given_name: String,
    pub family_name: String,
}

/// Show the profile form prefilled from Cognito
///
/// # Errors
/// Returns an error if there is no access token or `GetUser` fails
pub async fn show_profile(
    access_token: Option<web::ReqData<AccessToken>>,
    session_manager: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let access_token = require_access_token(access_token)?;
    let user = session_manager.provider().get_user(&access_token).await?;

    Ok(ResponseBuilder::html(views::profile_page(
        user.attribute("given_name").unwrap_or_default(),
        user.attribute("family_name").unwrap_or_default(),
    )?))
}

/// Update the name attributes, then redirect back to the form
///
/// The identity token still carries the old names, so the session is
/// refreshed when possible.
///
/// # Errors
/// Returns an error on empty names, without an access token, or if the update fails
pub async fn update_profile(
    req: HttpRequest,
    form: web::Form<ProfileForm>,
    access_token: Option<web::ReqData<AccessToken>>,
    session_manager: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let access_token = require_access_token(access_token)?;
    let given_name = form.given_name.trim();
    let family_name = form.family_name.trim();
    if given_name.is_empty() || family_name.is_empty() {
        return Err(AppError::bad_request(
            "First and last name are both required.",
        ));
    }

    session_manager
        .provider()
        .update_user_attributes(
            &access_token,
            &[
                UserAttribute::new("given_name", given_name),
                UserAttribute::new("family_name", family_name),
            ],
        )
        .await?;

    let cookies = match session_manager.reissue_session_cookies(&req).await {
        Ok(cookies) => cookies,
        Err(e) => {
            log::warn!("Profile updated but session not refreshed: {e}");
            Vec::new()
        }
    };

    Ok(ResponseBuilder::see_other("/profile", cookies))
}
