//! HTML pages, rendered from the askama templates under `templates/`

use askama::Template;
use qrcode::render::svg;
use qrcode::QrCode;

use crate::models::Principal;

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate<'a> {
    display_name: String,
    claims_json: &'a str,
}

#[derive(Template)]
#[template(path = "oops.html")]
struct OopsTemplate;

#[derive(Template)]
#[template(path = "profile.html")]
struct ProfileTemplate<'a> {
    given_name: &'a str,
    family_name: &'a str,
}

#[derive(Template)]
#[template(path = "totp_setup.html")]
struct TotpSetupTemplate<'a> {
    qr_svg: Option<String>,
    provisioning_uri: &'a str,
    secret: &'a str,
}

#[derive(Template)]
#[template(path = "totp_message.html")]
struct TotpMessageTemplate<'a> {
    message: &'a str,
}

/// Home page showing the caller and their decoded identity token
///
/// # Errors
/// Returns an error if the template fails to render
pub fn index_page(principal: &Principal, claims_json: &str) -> askama::Result<String> {
    IndexTemplate {
        display_name: principal.display_name(),
        claims_json,
    }
    .render()
}

/// # Errors
/// Returns an error if the template fails to render
pub fn oops_page() -> askama::Result<String> {
    OopsTemplate.render()
}

/// # Errors
/// Returns an error if the template fails to render
pub fn profile_page(given_name: &str, family_name: &str) -> askama::Result<String> {
    ProfileTemplate {
        given_name,
        family_name,
    }
    .render()
}

/// TOTP enrollment page with a QR code of the provisioning URI
///
/// # Errors
/// Returns an error if the template fails to render
pub fn totp_setup_page(provisioning_uri: &str, secret: &str) -> askama::Result<String> {
    TotpSetupTemplate {
        qr_svg: qr_code_svg(provisioning_uri),
        provisioning_uri,
        secret,
    }
    .render()
}

/// # Errors
/// Returns an error if the template fails to render
pub fn totp_message_page(message: &str) -> askama::Result<String> {
    TotpMessageTemplate { message }.render()
}

/// Inline SVG of `data`; `None` if it does not fit in a QR code
fn qr_code_svg(data: &str) -> Option<String> {
    let code = match QrCode::new(data.as_bytes()) {
        Ok(code) => code,
        Err(e) => {
            log::warn!("Could not encode provisioning URI as QR code: {e}");
            return None;
        }
    };
    let image = code
        .render::<svg::Color<'_>>()
        .min_dimensions(200, 200)
        .build();
    // Drop the XML prolog so the image can sit inside the page
    image.find("<svg").map(|start| image[start..].to_string())
}
