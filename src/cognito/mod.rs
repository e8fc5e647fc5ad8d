//! Cognito identity provider client
//!
//! Everything the gate needs from the user pool goes through the
//! [`IdentityProvider`] trait: the OAuth2 token endpoint of the hosted UI,
//! the pool's JWKS document and the user-facing JSON API used by the
//! profile and MFA pages.

pub mod hosted_ui;
pub mod jwt_validation;
pub mod token;
pub mod user;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::settings::CognitoSettings;

pub use jwt_validation::{
    IdentityTokenClaims, JsonWebKey, JsonWebKeySet, JwtValidationError, JwtValidator,
};
pub use token::TokenSet;
pub use user::{CognitoUser, UserAttribute, VerificationStatus};

/// Content type of the Cognito user pool JSON API
const AMZ_JSON: &str = "application/x-amz-json-1.1";
const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";

/// Errors returned by the identity provider
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Request to identity provider failed: {0}")]
    Network(String),

    #[error("Identity provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Identity provider rejected the request ({error_type}): {message}")]
    Api { error_type: String, message: String },

    #[error("Unexpected response from identity provider: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// The Cognito exception name for API errors, e.g. `CodeMismatchException`
    #[must_use]
    pub fn error_type(&self) -> Option<&str> {
        match self {
            Self::Api { error_type, .. } => Some(error_type.as_str()),
            _ => None,
        }
    }

    /// True when Cognito rejected a one-time code supplied by the user
    #[must_use]
    pub fn is_code_rejection(&self) -> bool {
        matches!(
            self.error_type(),
            Some(
                "CodeMismatchException"
                    | "EnableSoftwareTokenMFAException"
                    | "InvalidParameterException"
            )
        )
    }
}

/// Operations the gate performs against the identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange an authorization code from the hosted UI for a token set
    ///
    /// # Errors
    ///
    /// Returns an error if the token endpoint is unreachable or rejects the code
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, ProviderError>;

    /// Obtain a fresh identity and access token using a refresh token
    ///
    /// # Errors
    ///
    /// Returns an error if the token endpoint is unreachable or rejects the refresh token
    async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenSet, ProviderError>;

    /// Fetch the pool's current signing keys
    ///
    /// # Errors
    ///
    /// Returns an error if the JWKS document cannot be fetched or parsed
    async fn fetch_jwks(&self) -> Result<JsonWebKeySet, ProviderError>;

    /// # Errors
    ///
    /// Returns an error if Cognito rejects the access token or the call fails
    async fn get_user(&self, access_token: &str) -> Result<CognitoUser, ProviderError>;

    /// # Errors
    ///
    /// Returns an error if Cognito rejects the update or the call fails
    async fn update_user_attributes(
        &self,
        access_token: &str,
        attributes: &[UserAttribute],
    ) -> Result<(), ProviderError>;

    /// Start TOTP enrollment, returning the shared secret
    ///
    /// # Errors
    ///
    /// Returns an error if Cognito rejects the request or the call fails
    async fn associate_software_token(&self, access_token: &str) -> Result<String, ProviderError>;

    /// # Errors
    ///
    /// Returns an error if Cognito rejects the code or the call fails
    async fn verify_software_token(
        &self,
        access_token: &str,
        user_code: &str,
    ) -> Result<VerificationStatus, ProviderError>;

    /// Enable TOTP and make it the preferred MFA method for the caller
    ///
    /// # Errors
    ///
    /// Returns an error if Cognito rejects the request or the call fails
    async fn enable_software_token_mfa(&self, access_token: &str) -> Result<(), ProviderError>;
}

/// HTTP implementation of [`IdentityProvider`] for a Cognito user pool
#[derive(Clone)]
pub struct CognitoClient {
    http: reqwest::Client,
    settings: CognitoSettings,
}

impl CognitoClient {
    #[must_use]
    pub fn new(settings: CognitoSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    /// Invoke one operation of the user pool JSON API
    async fn call_api<B, R>(&self, operation: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        log::debug!("Calling Cognito {operation}");

        let response = self
            .http
            .post(self.settings.api_endpoint())
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{operation}"))
            .header(reqwest::header::CONTENT_TYPE, AMZ_JSON)
            .body(
                serde_json::to_vec(body)
                    .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?,
            )
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("{operation}: {e}")))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Network(format!("{operation}: {e}")))?;

        if !status.is_success() {
            return Err(parse_api_error(status.as_u16(), &bytes));
        }

        // Some operations answer with an empty body
        let bytes = if bytes.is_empty() { &b"{}"[..] } else { &bytes[..] };
        serde_json::from_slice(bytes)
            .map_err(|e| ProviderError::InvalidResponse(format!("{operation}: {e}")))
    }
}

/// Turn a Cognito JSON error body (`{"__type": "...", "message": "..."}`) into a `ProviderError`
fn parse_api_error(status: u16, body: &[u8]) -> ProviderError {
    #[derive(serde::Deserialize)]
    struct ApiErrorBody {
        #[serde(rename = "__type")]
        error_type: Option<String>,
        #[serde(alias = "Message")]
        message: Option<String>,
    }

    match serde_json::from_slice::<ApiErrorBody>(body) {
        Ok(ApiErrorBody {
            error_type: Some(error_type),
            message,
        }) => ProviderError::Api {
            // Types may arrive namespaced, e.g. `com.amazonaws...#CodeMismatchException`
            error_type: error_type
                .rsplit('#')
                .next()
                .unwrap_or(error_type.as_str())
                .to_string(),
            message: message.unwrap_or_default(),
        },
        _ => ProviderError::Http {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        },
    }
}

#[async_trait]
impl IdentityProvider for CognitoClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, ProviderError> {
        token::request_tokens(
            &self.http,
            &self.settings,
            &token::authorization_code_params(&self.settings, code),
        )
        .await
    }

    async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenSet, ProviderError> {
        token::request_tokens(
            &self.http,
            &self.settings,
            &token::refresh_token_params(&self.settings, refresh_token),
        )
        .await
    }

    async fn fetch_jwks(&self) -> Result<JsonWebKeySet, ProviderError> {
        let jwks_uri = self.settings.jwks_uri();
        log::debug!("Fetching JWKS from: {jwks_uri}");

        let response = self
            .http
            .get(&jwks_uri)
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("Failed to fetch JWKS: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http { status, body });
        }

        let jwks: JsonWebKeySet = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse JWKS: {e}")))?;

        log::debug!("Successfully fetched JWKS ({} keys)", jwks.keys.len());
        Ok(jwks)
    }

    async fn get_user(&self, access_token: &str) -> Result<CognitoUser, ProviderError> {
        let response: user::GetUserResponse = self
            .call_api("GetUser", &user::AccessTokenRequest { access_token })
            .await?;
        Ok(response.into())
    }

    async fn update_user_attributes(
        &self,
        access_token: &str,
        attributes: &[UserAttribute],
    ) -> Result<(), ProviderError> {
        let _: serde_json::Value = self
            .call_api(
                "UpdateUserAttributes",
                &user::UpdateUserAttributesRequest {
                    access_token,
                    user_attributes: attributes,
                },
            )
            .await?;
        Ok(())
    }

    async fn associate_software_token(&self, access_token: &str) -> Result<String, ProviderError> {
        let response: user::AssociateSoftwareTokenResponse = self
            .call_api(
                "AssociateSoftwareToken",
                &user::AccessTokenRequest { access_token },
            )
            .await?;
        response.secret_code.ok_or_else(|| {
            ProviderError::InvalidResponse("AssociateSoftwareToken: missing SecretCode".to_string())
        })
    }

    async fn verify_software_token(
        &self,
        access_token: &str,
        user_code: &str,
    ) -> Result<VerificationStatus, ProviderError> {
        let response: user::VerifySoftwareTokenResponse = self
            .call_api(
                "VerifySoftwareToken",
                &user::VerifySoftwareTokenRequest {
                    access_token,
                    user_code,
                },
            )
            .await?;
        Ok(response.status.as_deref().map_or(
            VerificationStatus::Error,
            VerificationStatus::from_status,
        ))
    }

    async fn enable_software_token_mfa(&self, access_token: &str) -> Result<(), ProviderError> {
        let _: serde_json::Value = self
            .call_api(
                "SetUserMFAPreference",
                &user::SetUserMfaPreferenceRequest::software_token_preferred(access_token),
            )
            .await?;
        Ok(())
    }
}
