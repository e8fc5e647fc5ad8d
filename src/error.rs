use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::cognito::ProviderError;
use crate::session::gate::NOT_AUTHORIZED_PATH;
use crate::utils::logging::LoggingHelper;
use crate::utils::responses::ResponseBuilder;

/// Errors surfaced by the HTTP handlers
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 400 with the message as body
    #[error("{0}")]
    BadRequest(String),

    /// 500 with a fixed message as body; the cause is only logged
    #[error("{message}")]
    Upstream { message: String, cause: String },

    /// Redirect to the not-authorized page
    #[error("Not authorized")]
    Unauthorized,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn upstream(message: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Upstream {
            message: message.into(),
            cause: cause.to_string(),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        // A revoked or expired access token means the session is no good
        if err.error_type() == Some("NotAuthorizedException") {
            return Self::Unauthorized;
        }
        Self::upstream("Identity provider request failed.", err)
    }
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        Self::upstream("Failed to render page.", err)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized => StatusCode::FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::BadRequest(message) => {
                ResponseBuilder::plain_text(StatusCode::BAD_REQUEST, message.clone())
            }
            Self::Upstream { message, cause } => {
                LoggingHelper::log_upstream_error(message, cause);
                ResponseBuilder::plain_text(StatusCode::INTERNAL_SERVER_ERROR, message.clone())
            }
            Self::Unauthorized => ResponseBuilder::redirect(NOT_AUTHORIZED_PATH, Vec::new()),
        }
    }
}
