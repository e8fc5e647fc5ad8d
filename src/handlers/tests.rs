// Handler tests without the session gate; the access token is injected directly
use std::sync::Arc;

use actix_web::dev::Service;
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App, HttpMessage};

use super::*;
use crate::models::AccessToken;
use crate::testing::constants::{
    TEST_ACCESS_TOKEN, TEST_AUTH_DOMAIN, TEST_CLIENT_ID, TEST_TOTP_SECRET,
};
use crate::testing::mock::issued_tokens;
use crate::testing::{IdTokenBuilder, MockIdentityProvider, TestFixtures, VerifyOutcome};

macro_rules! handler_app {
    ($provider:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(TestFixtures::settings()))
                .app_data(web::Data::new(TestFixtures::session_manager($provider)))
                .wrap_fn(|req, srv| {
                    req.extensions_mut()
                        .insert(AccessToken(TEST_ACCESS_TOKEN.to_string()));
                    srv.call(req)
                })
                .route("/login", web::get().to(login))
                .route("/callback", web::get().to(callback))
                .route("/logout", web::get().to(logout))
                .route("/loggedout", web::get().to(logged_out))
                .route("/health", web::get().to(health))
                .route("/profile", web::get().to(show_profile))
                .route("/profile", web::post().to(update_profile))
                .route("/totp/setup", web::get().to(totp_setup))
                .route("/totp/verify", web::post().to(totp_verify)),
        )
        .await
    };
}

fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[actix_web::test]
async fn test_require_access_token_missing_is_unauthorized() {
    assert!(matches!(
        require_access_token(None),
        Err(AppError::Unauthorized)
    ));
}

#[actix_web::test]
async fn test_login_redirects_to_hosted_ui() {
    let app = handler_app!(Arc::new(MockIdentityProvider::new()));
    let resp = test::call_service(&app, test::TestRequest::get().uri("/login").to_request()).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    let location = location(&resp);
    assert!(location.starts_with(&format!("{TEST_AUTH_DOMAIN}/login?")));
    assert!(location.contains(&format!("client_id={TEST_CLIENT_ID}")));
    assert!(location.contains("response_type=code"));
}

#[actix_web::test]
async fn test_callback_without_code_is_bad_request() {
    let provider = Arc::new(MockIdentityProvider::new());
    let app = handler_app!(provider.clone());

    for uri in ["/callback", "/callback?code=", "/callback?error=access_denied"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
        let body = test::read_body(resp).await;
        assert_eq!(body, "Invalid request: No code provided.");
    }
    assert_eq!(provider.exchange_calls(), 0);
}

#[actix_web::test]
async fn test_callback_sets_session_cookies() {
    let settings = TestFixtures::settings();
    let id_token = IdTokenBuilder::new(&settings.cognito).build();
    let provider =
        Arc::new(MockIdentityProvider::new().with_exchange_tokens(issued_tokens(id_token.clone())));
    let app = handler_app!(provider.clone());

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/callback?code=abc123")
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    assert_eq!(provider.exchange_calls(), 1);

    let cookies: Vec<_> = resp.response().cookies().collect();
    let jwt = cookies.iter().find(|c| c.name() == "jwt").expect("jwt cookie");
    assert_eq!(jwt.value(), id_token);
    assert_eq!(jwt.http_only(), Some(true));
    assert!(cookies.iter().any(|c| c.name() == "at"));
    assert!(cookies.iter().any(|c| c.name() == "rt"));
}

#[actix_web::test]
async fn test_callback_exchange_failure_is_server_error() {
    let app = handler_app!(Arc::new(MockIdentityProvider::new()));
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/callback?code=stale")
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.response().cookies().count(), 0);
    let body = test::read_body(resp).await;
    assert_eq!(body, "Failed to exchange authorization code.");
}

#[actix_web::test]
async fn test_logout_clears_cookies() {
    let app = handler_app!(Arc::new(MockIdentityProvider::new()));
    let resp = test::call_service(&app, test::TestRequest::get().uri("/logout").to_request()).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(location(&resp).starts_with(&format!("{TEST_AUTH_DOMAIN}/logout?")));
    let cleared: Vec<_> = resp
        .response()
        .cookies()
        .map(|c| (c.name().to_string(), c.value().to_string()))
        .collect();
    assert_eq!(cleared.len(), 3);
    assert!(cleared.iter().all(|(_, value)| value.is_empty()));
}

#[actix_web::test]
async fn test_logged_out_and_health() {
    let app = handler_app!(Arc::new(MockIdentityProvider::new()));

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/loggedout").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await, "you're out");

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(json["status"], "ok");
}

#[actix_web::test]
async fn test_profile_shows_current_names() {
    let provider = Arc::new(MockIdentityProvider::new());
    let app = handler_app!(provider.clone());

    let resp = test::call_service(&app, test::TestRequest::get().uri("/profile").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("value=\"Jane\""));
    assert!(body.contains("value=\"Doe\""));
    assert_eq!(provider.access_tokens_seen(), vec![TEST_ACCESS_TOKEN]);
}

#[actix_web::test]
async fn test_profile_update_sends_attributes() {
    let provider = Arc::new(MockIdentityProvider::new());
    let app = handler_app!(provider.clone());

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/profile")
            .set_form([("given_name", "Janet"), ("family_name", "Smith")])
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/profile");
    let updated = provider.updated_attributes();
    assert_eq!(updated.len(), 2);
    assert_eq!(updated[0].name, "given_name");
    assert_eq!(updated[0].value, "Janet");
    assert_eq!(updated[1].value, "Smith");
}

#[actix_web::test]
async fn test_profile_update_rejects_blank_names() {
    let provider = Arc::new(MockIdentityProvider::new());
    let app = handler_app!(provider.clone());

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/profile")
            .set_form([("given_name", " "), ("family_name", "Smith")])
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(provider.update_attribute_calls(), 0);
}

#[actix_web::test]
async fn test_profile_with_revoked_access_token_redirects() {
    let provider = Arc::new(MockIdentityProvider::new().with_api_error("NotAuthorizedException"));
    let app = handler_app!(provider);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/profile").to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/oops");
}

#[actix_web::test]
async fn test_totp_setup_shows_secret() {
    let provider = Arc::new(MockIdentityProvider::new());
    let app = handler_app!(provider.clone());

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/totp/setup").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains(TEST_TOTP_SECRET));
    assert!(body.contains("otpauth://totp/AWSCognito:jdoe"));
    assert_eq!(provider.associate_calls(), 1);
}

#[actix_web::test]
async fn test_totp_setup_when_already_enabled() {
    let provider = Arc::new(MockIdentityProvider::new().with_totp_enabled());
    let app = handler_app!(provider.clone());

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/totp/setup").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("MFA is already enabled"));
    assert_eq!(provider.associate_calls(), 0);
}

#[actix_web::test]
async fn test_totp_verify_outcomes() {
    let cases = [
        (VerifyOutcome::Success, StatusCode::OK, 1),
        (VerifyOutcome::StatusError, StatusCode::BAD_REQUEST, 0),
        (VerifyOutcome::CodeMismatch, StatusCode::BAD_REQUEST, 0),
    ];

    for (outcome, expected_status, enable_calls) in cases {
        let provider = Arc::new(MockIdentityProvider::new().with_verify_outcome(outcome));
        let app = handler_app!(provider.clone());

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/totp/verify")
                .set_form([("code", "123456")])
                .to_request(),
        )
        .await;

        assert_eq!(resp.status(), expected_status, "{outcome:?}");
        assert_eq!(provider.enable_mfa_calls(), enable_calls, "{outcome:?}");
        if expected_status == StatusCode::BAD_REQUEST {
            assert_eq!(test::read_body(resp).await, "Error: Verification failed");
        }
    }
}

#[actix_web::test]
async fn test_totp_verify_empty_code() {
    let provider = Arc::new(MockIdentityProvider::new());
    let app = handler_app!(provider.clone());

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/totp/verify")
            .set_form([("code", "")])
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(provider.verify_calls(), 0);
}

#[actix_web::test]
async fn test_totp_verify_when_already_enabled() {
    let provider = Arc::new(MockIdentityProvider::new().with_totp_enabled());
    let app = handler_app!(provider.clone());

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/totp/verify")
            .set_form([("code", "123456")])
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(test::read_body(resp).await, "MFA is already enabled");
    assert_eq!(provider.verify_calls(), 0);
}

#[actix_web::test]
async fn test_totp_verify_other_api_error_is_server_error() {
    let provider = Arc::new(MockIdentityProvider::new().with_api_error("InternalErrorException"));
    let app = handler_app!(provider);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/totp/verify")
            .set_form([("code", "123456")])
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
