//! HTTP response helpers
//!
//! Redirects carry any cookies the flow needs to set or clear; pages are
//! served as UTF-8 HTML.

use actix_web::{cookie::Cookie, http::header, http::StatusCode, HttpResponse, HttpResponseBuilder};

pub struct ResponseBuilder;

impl ResponseBuilder {
    fn with_cookies(
        mut builder: HttpResponseBuilder,
        location: &str,
        cookies: Vec<Cookie<'static>>,
    ) -> HttpResponse {
        for cookie in cookies {
            builder.cookie(cookie);
        }
        builder
            .insert_header((header::LOCATION, location.to_string()))
            .finish()
    }

    /// 302 redirect with optional cookies
    #[must_use]
    pub fn redirect(location: &str, cookies: Vec<Cookie<'static>>) -> HttpResponse {
        Self::with_cookies(HttpResponse::Found(), location, cookies)
    }

    /// 303 redirect, used after form posts
    #[must_use]
    pub fn see_other(location: &str, cookies: Vec<Cookie<'static>>) -> HttpResponse {
        Self::with_cookies(HttpResponse::SeeOther(), location, cookies)
    }

    #[must_use]
    pub fn html(body: String) -> HttpResponse {
        Self::html_with_status(StatusCode::OK, body)
    }

    #[must_use]
    pub fn html_with_status(status: StatusCode, body: String) -> HttpResponse {
        HttpResponse::build(status)
            .content_type("text/html; charset=utf-8")
            .body(body)
    }

    #[must_use]
    pub fn plain_text(status: StatusCode, body: impl Into<String>) -> HttpResponse {
        HttpResponse::build(status)
            .content_type("text/plain; charset=utf-8")
            .body(body.into())
    }

    #[must_use]
    pub fn internal_server_error() -> HttpResponse {
        Self::plain_text(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}
