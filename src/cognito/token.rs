//! OAuth2 token endpoint of the Cognito hosted UI
//!
//! Both the authorization-code exchange and the refresh-token grant are a
//! single form-encoded POST to `{auth_domain}/oauth2/token`. No retries.

use serde::{Deserialize, Serialize};

use super::ProviderError;
use crate::settings::CognitoSettings;

/// Tokens returned by the token endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenSet {
    pub id_token: String,
    pub access_token: String,
    /// Only present on the authorization-code grant
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: String,
}

const fn default_expires_in() -> u64 {
    3600
}

/// Form body for `grant_type=authorization_code`
#[must_use]
pub fn authorization_code_params(
    settings: &CognitoSettings,
    code: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("grant_type", "authorization_code".to_string()),
        ("client_id", settings.client_id.clone()),
        ("redirect_uri", settings.redirect_uri.clone()),
        ("code", code.to_string()),
    ]
}

/// Form body for `grant_type=refresh_token`
#[must_use]
pub fn refresh_token_params(
    settings: &CognitoSettings,
    refresh_token: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("grant_type", "refresh_token".to_string()),
        ("client_id", settings.client_id.clone()),
        ("refresh_token", refresh_token.to_string()),
    ]
}

/// POST the given grant to the token endpoint
///
/// App clients with a secret authenticate with HTTP Basic auth.
///
/// # Errors
///
/// Returns an error on network failure, a non-2xx status or an unparseable body
pub async fn request_tokens(
    http: &reqwest::Client,
    settings: &CognitoSettings,
    params: &[(&'static str, String)],
) -> Result<TokenSet, ProviderError> {
    let token_endpoint = settings.token_endpoint();
    let grant_type = params
        .iter()
        .find(|(name, _)| *name == "grant_type")
        .map_or("unknown", |(_, value)| value.as_str());
    log::debug!("Requesting tokens ({grant_type}) from {token_endpoint}");

    let mut request = http.post(&token_endpoint).form(params);
    if let Some(secret) = settings.client_secret.as_deref() {
        request = request.basic_auth(&settings.client_id, Some(secret));
    }

    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::Network(format!("Token request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Http {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<TokenSet>()
        .await
        .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse token response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::constants::TEST_CLIENT_ID;
    use crate::testing::TestFixtures;
    use wiremock::matchers::{basic_auth, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(server: &MockServer) -> CognitoSettings {
        CognitoSettings {
            auth_domain: server.uri(),
            ..TestFixtures::cognito_settings()
        }
    }

    fn token_response() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id_token": "id",
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 3600,
            "token_type": "Bearer"
        }))
    }

    #[test]
    fn test_authorization_code_params() {
        let settings = TestFixtures::cognito_settings();
        let params = authorization_code_params(&settings, "the-code");

        assert_eq!(
            params,
            vec![
                ("grant_type", "authorization_code".to_string()),
                ("client_id", settings.client_id.clone()),
                ("redirect_uri", settings.redirect_uri.clone()),
                ("code", "the-code".to_string()),
            ]
        );
    }

    #[test]
    fn test_refresh_token_params_omit_redirect_uri() {
        let settings = TestFixtures::cognito_settings();
        let params = refresh_token_params(&settings, "rt-value");

        assert!(params.contains(&("grant_type", "refresh_token".to_string())));
        assert!(params.contains(&("refresh_token", "rt-value".to_string())));
        assert!(!params.iter().any(|(name, _)| *name == "redirect_uri"));
    }

    #[test]
    fn test_token_set_from_refresh_response() {
        // Refresh responses carry no refresh token
        let body = r#"{"id_token":"id","access_token":"at","expires_in":900,"token_type":"Bearer"}"#;
        let tokens: TokenSet = serde_json::from_str(body).unwrap();

        assert_eq!(tokens.refresh_token, None);
        assert_eq!(tokens.expires_in, 900);
        assert_eq!(tokens.token_type, "Bearer");
    }

    #[test]
    fn test_token_set_defaults_expiry() {
        let body = r#"{"id_token":"id","access_token":"at","refresh_token":"rt"}"#;
        let tokens: TokenSet = serde_json::from_str(body).unwrap();

        assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));
        assert_eq!(tokens.expires_in, 3600);
    }

    #[tokio::test]
    async fn test_code_exchange_posts_form() {
        let server = MockServer::start().await;
        let settings = settings_for(&server);
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .and(body_string_contains(format!(
                "redirect_uri={}",
                urlencoding::encode(&settings.redirect_uri)
            )))
            .respond_with(token_response())
            .expect(1)
            .mount(&server)
            .await;

        let tokens = request_tokens(
            &reqwest::Client::new(),
            &settings,
            &authorization_code_params(&settings, "the-code"),
        )
        .await
        .unwrap();

        assert_eq!(tokens.id_token, "id");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_client_secret_is_sent_as_basic_auth() {
        let server = MockServer::start().await;
        let settings = CognitoSettings {
            client_secret: Some("s3cret".to_string()),
            ..settings_for(&server)
        };
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(basic_auth(TEST_CLIENT_ID, "s3cret"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=rt-value"))
            .respond_with(token_response())
            .expect(1)
            .mount(&server)
            .await;

        let result = request_tokens(
            &reqwest::Client::new(),
            &settings,
            &refresh_token_params(&settings, "rt-value"),
        )
        .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_rejected_grant_is_http_error() {
        let server = MockServer::start().await;
        let settings = settings_for(&server);
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#),
            )
            .mount(&server)
            .await;

        let err = request_tokens(
            &reqwest::Client::new(),
            &settings,
            &refresh_token_params(&settings, "expired"),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            ProviderError::Http { status: 400, ref body } if body.contains("invalid_grant")
        ));
    }

    #[tokio::test]
    async fn test_unparseable_token_response() {
        let server = MockServer::start().await;
        let settings = settings_for(&server);
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = request_tokens(
            &reqwest::Client::new(),
            &settings,
            &authorization_code_params(&settings, "the-code"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }
}
