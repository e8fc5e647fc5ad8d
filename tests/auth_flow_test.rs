// End-to-end login, session and logout flows through the session gate
use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use cognito_gate::configure_services;
use cognito_gate::testing::constants::{
    REFRESHED_ACCESS_TOKEN, TEST_ACCESS_TOKEN, TEST_AUTH_DOMAIN, TEST_LOGOUT_REDIRECT_URI,
    TEST_REFRESH_TOKEN, TEST_USERNAME,
};
use cognito_gate::testing::mock::issued_tokens;
use cognito_gate::testing::{IdTokenBuilder, MockIdentityProvider, TestFixtures};

const THIRTY_DAYS_SECS: i64 = 30 * 24 * 60 * 60;

macro_rules! gated_app {
    ($provider:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(TestFixtures::settings()))
                .app_data(web::Data::new(TestFixtures::session_manager($provider)))
                .configure(configure_services),
        )
        .await
    };
}

fn get_with_cookies(uri: &str, cookies: Vec<Cookie<'static>>) -> test::TestRequest {
    cookies
        .into_iter()
        .fold(test::TestRequest::get().uri(uri), test::TestRequest::cookie)
}

fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn response_cookies<B>(resp: &ServiceResponse<B>) -> Vec<Cookie<'static>> {
    resp.response()
        .cookies()
        .map(|cookie| cookie.into_owned())
        .collect()
}

fn find<'a>(cookies: &'a [Cookie<'static>], name: &str) -> &'a Cookie<'static> {
    cookies
        .iter()
        .find(|cookie| cookie.name() == name)
        .unwrap_or_else(|| panic!("missing {name} cookie"))
}

#[actix_web::test]
async fn test_protected_route_without_cookie_redirects_to_oops() {
    let provider = Arc::new(MockIdentityProvider::new());
    let app = gated_app!(provider.clone());

    for uri in ["/", "/profile", "/totp/setup"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FOUND, "{uri}");
        assert_eq!(location(&resp), "/oops", "{uri}");
    }
    assert_eq!(provider.jwks_calls(), 0);
    assert_eq!(provider.get_user_calls(), 0);
}

#[actix_web::test]
async fn test_public_routes_need_no_session() {
    let app = gated_app!(Arc::new(MockIdentityProvider::new()));

    let resp = test::call_service(&app, test::TestRequest::get().uri("/oops").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("You are not logged in!"));

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/login").to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(location(&resp).starts_with(TEST_AUTH_DOMAIN));
}

#[actix_web::test]
async fn test_callback_without_code_is_bad_request() {
    let app = gated_app!(Arc::new(MockIdentityProvider::new()));

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/callback").to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        test::read_body(resp).await,
        "Invalid request: No code provided."
    );
}

#[actix_web::test]
async fn test_callback_issues_cookies_with_session_lifetimes() {
    let settings = TestFixtures::settings();
    let id_token = IdTokenBuilder::new(&settings.cognito).build();
    let provider =
        Arc::new(MockIdentityProvider::new().with_exchange_tokens(issued_tokens(id_token.clone())));
    let app = gated_app!(provider.clone());

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/callback?code=auth-code")
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");

    let cookies = response_cookies(&resp);
    let jwt = find(&cookies, "jwt");
    assert_eq!(jwt.value(), id_token);
    assert_eq!(jwt.max_age().map(|age| age.whole_seconds()), Some(THIRTY_DAYS_SECS));
    assert_eq!(jwt.http_only(), Some(true));
    assert_eq!(jwt.secure(), Some(true));
    assert_eq!(jwt.path(), Some("/"));

    let at = find(&cookies, "at");
    assert_eq!(at.value(), TEST_ACCESS_TOKEN);
    assert_eq!(at.max_age().map(|age| age.whole_seconds()), Some(3600));

    let rt = find(&cookies, "rt");
    assert_eq!(rt.value(), TEST_REFRESH_TOKEN);
    assert_eq!(rt.max_age().map(|age| age.whole_seconds()), Some(THIRTY_DAYS_SECS));
}

#[actix_web::test]
async fn test_callback_exchange_failure() {
    let app = gated_app!(Arc::new(MockIdentityProvider::new()));

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/callback?code=reused-code")
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response_cookies(&resp).is_empty());
}

#[actix_web::test]
async fn test_valid_session_renders_home_page() {
    let settings = TestFixtures::settings();
    let provider = Arc::new(MockIdentityProvider::new());
    let app = gated_app!(provider.clone());
    let id_token = IdTokenBuilder::new(&settings.cognito).build();

    let resp = test::call_service(
        &app,
        get_with_cookies("/", TestFixtures::session_cookies(&id_token)).to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(response_cookies(&resp).is_empty());
    assert_eq!(provider.refresh_calls(), 0);

    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("Jane Doe"));
    assert!(body.contains(TEST_USERNAME));
}

#[actix_web::test]
async fn test_expired_session_is_refreshed_once() {
    let settings = TestFixtures::settings();
    let refreshed = IdTokenBuilder::new(&settings.cognito).build();
    let provider = Arc::new(MockIdentityProvider::new().with_refreshed_id_token(refreshed.clone()));
    let app = gated_app!(provider.clone());
    let expired = IdTokenBuilder::new(&settings.cognito).expired().build();

    let resp = test::call_service(
        &app,
        get_with_cookies("/", TestFixtures::session_cookies(&expired)).to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(provider.refresh_calls(), 1);
    assert_eq!(provider.refresh_tokens_seen(), vec![TEST_REFRESH_TOKEN]);

    let cookies = response_cookies(&resp);
    assert_eq!(find(&cookies, "jwt").value(), refreshed);
    assert_eq!(find(&cookies, "at").value(), REFRESHED_ACCESS_TOKEN);
}

#[actix_web::test]
async fn test_refreshed_access_token_reaches_handler() {
    let settings = TestFixtures::settings();
    let refreshed = IdTokenBuilder::new(&settings.cognito).build();
    let provider = Arc::new(MockIdentityProvider::new().with_refreshed_id_token(refreshed));
    let app = gated_app!(provider.clone());
    let expired = IdTokenBuilder::new(&settings.cognito).expired().build();

    let resp = test::call_service(
        &app,
        get_with_cookies("/profile", TestFixtures::session_cookies(&expired)).to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(provider.access_tokens_seen(), vec![REFRESHED_ACCESS_TOKEN]);
}

#[actix_web::test]
async fn test_expired_session_with_rejected_refresh_token() {
    let settings = TestFixtures::settings();
    let refreshed = IdTokenBuilder::new(&settings.cognito).build();
    let provider = Arc::new(MockIdentityProvider::new().with_refreshed_id_token(refreshed));
    let app = gated_app!(provider.clone());
    let expired = IdTokenBuilder::new(&settings.cognito).expired().build();

    let resp = test::call_service(
        &app,
        get_with_cookies(
            "/",
            vec![
                Cookie::new("jwt", expired),
                Cookie::new("rt", "revoked-refresh-token"),
            ],
        )
        .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/oops");
    assert_eq!(provider.refresh_calls(), 1);
}

#[actix_web::test]
async fn test_expired_session_without_refresh_token() {
    let settings = TestFixtures::settings();
    let provider = Arc::new(MockIdentityProvider::new());
    let app = gated_app!(provider.clone());
    let expired = IdTokenBuilder::new(&settings.cognito).expired().build();

    let resp = test::call_service(
        &app,
        get_with_cookies("/", vec![Cookie::new("jwt", expired)]).to_request(),
    )
    .await;

    assert_eq!(location(&resp), "/oops");
    assert_eq!(provider.refresh_calls(), 0);
}

#[actix_web::test]
async fn test_tampered_token_is_not_refreshed() {
    let settings = TestFixtures::settings();
    let provider = Arc::new(MockIdentityProvider::new());
    let app = gated_app!(provider.clone());
    let foreign = IdTokenBuilder::new(&settings.cognito)
        .claim("aud", "some-other-client")
        .build();

    let resp = test::call_service(
        &app,
        get_with_cookies("/", TestFixtures::session_cookies(&foreign)).to_request(),
    )
    .await;

    assert_eq!(location(&resp), "/oops");
    assert_eq!(provider.refresh_calls(), 0);
}

#[actix_web::test]
async fn test_logout_clears_all_session_cookies() {
    let settings = TestFixtures::settings();
    let app = gated_app!(Arc::new(MockIdentityProvider::new()));
    let id_token = IdTokenBuilder::new(&settings.cognito).build();

    let resp = test::call_service(
        &app,
        get_with_cookies("/logout", TestFixtures::session_cookies(&id_token)).to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    let location = location(&resp);
    assert!(location.starts_with(&format!("{TEST_AUTH_DOMAIN}/logout?")));
    assert!(location.contains(&urlencoding::encode(TEST_LOGOUT_REDIRECT_URI).into_owned()));

    let cookies = response_cookies(&resp);
    for name in ["jwt", "at", "rt"] {
        let cookie = find(&cookies, name);
        assert_eq!(cookie.value(), "");
        assert!(cookie.max_age().is_some_and(|age| age.whole_seconds() <= 0));
    }

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/loggedout").to_request()).await;
    assert_eq!(test::read_body(resp).await, "you're out");
}
