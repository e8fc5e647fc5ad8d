//! In-memory identity provider
//!
//! Responses are configured up front; every call is counted so tests can
//! assert how often the gate went to the provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::constants::{
    REFRESHED_ACCESS_TOKEN, TEST_ACCESS_TOKEN, TEST_EMAIL, TEST_FAMILY_NAME, TEST_GIVEN_NAME,
    TEST_REFRESH_TOKEN, TEST_SUB, TEST_TOTP_SECRET, TEST_USERNAME,
};
use super::tokens::test_jwks;
use crate::cognito::{
    CognitoUser, IdentityProvider, JsonWebKeySet, ProviderError, TokenSet, UserAttribute,
    VerificationStatus,
};

/// What `VerifySoftwareToken` should answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Success,
    /// `Status: ERROR` in a successful response
    StatusError,
    /// `CodeMismatchException`
    CodeMismatch,
}

#[derive(Default)]
struct CallCounters {
    exchange: AtomicUsize,
    refresh: AtomicUsize,
    jwks: AtomicUsize,
    get_user: AtomicUsize,
    update_attributes: AtomicUsize,
    associate: AtomicUsize,
    verify: AtomicUsize,
    enable_mfa: AtomicUsize,
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

fn rejected_grant() -> ProviderError {
    ProviderError::Http {
        status: 400,
        body: r#"{"error":"invalid_grant"}"#.to_string(),
    }
}

pub struct MockIdentityProvider {
    exchange_tokens: Option<TokenSet>,
    refresh_tokens: Option<TokenSet>,
    jwks: Option<JsonWebKeySet>,
    jwks_gate: Option<Arc<Notify>>,
    user: Mutex<CognitoUser>,
    verify_outcome: VerifyOutcome,
    api_error: Option<String>,
    calls: CallCounters,
    refresh_tokens_seen: Mutex<Vec<String>>,
    access_tokens_seen: Mutex<Vec<String>>,
    updated_attributes: Mutex<Vec<UserAttribute>>,
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockIdentityProvider {
    /// Provider serving the test JWKS, with every grant rejected until configured
    #[must_use]
    pub fn new() -> Self {
        Self {
            exchange_tokens: None,
            refresh_tokens: None,
            jwks: Some(test_jwks()),
            jwks_gate: None,
            user: Mutex::new(Self::default_user()),
            verify_outcome: VerifyOutcome::Success,
            api_error: None,
            calls: CallCounters::default(),
            refresh_tokens_seen: Mutex::new(Vec::new()),
            access_tokens_seen: Mutex::new(Vec::new()),
            updated_attributes: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn default_user() -> CognitoUser {
        CognitoUser {
            username: TEST_USERNAME.to_string(),
            attributes: vec![
                UserAttribute::new("sub", TEST_SUB),
                UserAttribute::new("given_name", TEST_GIVEN_NAME),
                UserAttribute::new("family_name", TEST_FAMILY_NAME),
                UserAttribute::new("email", TEST_EMAIL),
            ],
            mfa_settings: Vec::new(),
            preferred_mfa_setting: None,
        }
    }

    /// Accept any authorization code, answering with `tokens`
    #[must_use]
    pub fn with_exchange_tokens(mut self, tokens: TokenSet) -> Self {
        self.exchange_tokens = Some(tokens);
        self
    }

    /// Accept refresh tokens equal to the test refresh token, answering with a new
    /// identity token and the refreshed access token
    #[must_use]
    pub fn with_refreshed_id_token(mut self, id_token: String) -> Self {
        self.refresh_tokens = Some(TokenSet {
            id_token,
            access_token: REFRESHED_ACCESS_TOKEN.to_string(),
            refresh_token: None,
            expires_in: 3600,
            token_type: "Bearer".to_string(),
        });
        self
    }

    #[must_use]
    pub fn without_jwks(mut self) -> Self {
        self.jwks = None;
        self
    }

    /// Hold every JWKS response until `gate` is notified
    #[must_use]
    pub fn with_jwks_gate(mut self, gate: Arc<Notify>) -> Self {
        self.jwks_gate = Some(gate);
        self
    }

    #[must_use]
    pub fn with_user(self, user: CognitoUser) -> Self {
        if let Ok(mut current) = self.user.lock() {
            *current = user;
        }
        self
    }

    /// Start with TOTP already enabled for the user
    #[must_use]
    pub fn with_totp_enabled(self) -> Self {
        let mut user = Self::default_user();
        user.mfa_settings = vec![crate::cognito::user::SOFTWARE_TOKEN_MFA.to_string()];
        self.with_user(user)
    }

    #[must_use]
    pub fn with_verify_outcome(mut self, outcome: VerifyOutcome) -> Self {
        self.verify_outcome = outcome;
        self
    }

    /// Fail every user API call with the given Cognito exception name
    #[must_use]
    pub fn with_api_error(mut self, error_type: &str) -> Self {
        self.api_error = Some(error_type.to_string());
        self
    }

    fn check_api(&self, access_token: &str) -> Result<(), ProviderError> {
        if let Ok(mut seen) = self.access_tokens_seen.lock() {
            seen.push(access_token.to_string());
        }
        match &self.api_error {
            Some(error_type) => Err(ProviderError::Api {
                error_type: error_type.clone(),
                message: "mock failure".to_string(),
            }),
            None => Ok(()),
        }
    }

    fn current_user(&self) -> CognitoUser {
        self.user
            .lock()
            .map(|user| user.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn exchange_calls(&self) -> usize {
        self.calls.exchange.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.calls.refresh.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn jwks_calls(&self) -> usize {
        self.calls.jwks.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn get_user_calls(&self) -> usize {
        self.calls.get_user.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn update_attribute_calls(&self) -> usize {
        self.calls.update_attributes.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn associate_calls(&self) -> usize {
        self.calls.associate.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn verify_calls(&self) -> usize {
        self.calls.verify.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn enable_mfa_calls(&self) -> usize {
        self.calls.enable_mfa.load(Ordering::SeqCst)
    }

    /// Refresh tokens presented to the token endpoint, in call order
    #[must_use]
    pub fn refresh_tokens_seen(&self) -> Vec<String> {
        self.refresh_tokens_seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }

    /// Access tokens presented to the user API, in call order
    #[must_use]
    pub fn access_tokens_seen(&self) -> Vec<String> {
        self.access_tokens_seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn updated_attributes(&self) -> Vec<UserAttribute> {
        self.updated_attributes
            .lock()
            .map(|attrs| attrs.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn exchange_code(&self, _code: &str) -> Result<TokenSet, ProviderError> {
        bump(&self.calls.exchange);
        self.exchange_tokens.clone().ok_or_else(rejected_grant)
    }

    async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenSet, ProviderError> {
        bump(&self.calls.refresh);
        if let Ok(mut seen) = self.refresh_tokens_seen.lock() {
            seen.push(refresh_token.to_string());
        }
        if refresh_token != TEST_REFRESH_TOKEN {
            return Err(rejected_grant());
        }
        self.refresh_tokens.clone().ok_or_else(rejected_grant)
    }

    async fn fetch_jwks(&self) -> Result<JsonWebKeySet, ProviderError> {
        bump(&self.calls.jwks);
        if let Some(gate) = &self.jwks_gate {
            gate.notified().await;
        }
        self.jwks
            .clone()
            .ok_or_else(|| ProviderError::Network("JWKS endpoint unreachable".to_string()))
    }

    async fn get_user(&self, access_token: &str) -> Result<CognitoUser, ProviderError> {
        bump(&self.calls.get_user);
        self.check_api(access_token)?;
        Ok(self.current_user())
    }

    async fn update_user_attributes(
        &self,
        access_token: &str,
        attributes: &[UserAttribute],
    ) -> Result<(), ProviderError> {
        bump(&self.calls.update_attributes);
        self.check_api(access_token)?;
        if let Ok(mut updated) = self.updated_attributes.lock() {
            updated.extend_from_slice(attributes);
        }
        if let Ok(mut user) = self.user.lock() {
            for attribute in attributes {
                user.attributes.retain(|existing| existing.name != attribute.name);
                user.attributes.push(attribute.clone());
            }
        }
        Ok(())
    }

    async fn associate_software_token(&self, access_token: &str) -> Result<String, ProviderError> {
        bump(&self.calls.associate);
        self.check_api(access_token)?;
        Ok(TEST_TOTP_SECRET.to_string())
    }

    async fn verify_software_token(
        &self,
        access_token: &str,
        _user_code: &str,
    ) -> Result<VerificationStatus, ProviderError> {
        bump(&self.calls.verify);
        self.check_api(access_token)?;
        match self.verify_outcome {
            VerifyOutcome::Success => Ok(VerificationStatus::Success),
            VerifyOutcome::StatusError => Ok(VerificationStatus::Error),
            VerifyOutcome::CodeMismatch => Err(ProviderError::Api {
                error_type: "CodeMismatchException".to_string(),
                message: "Invalid code received for user".to_string(),
            }),
        }
    }

    async fn enable_software_token_mfa(&self, access_token: &str) -> Result<(), ProviderError> {
        bump(&self.calls.enable_mfa);
        self.check_api(access_token)?;
        if let Ok(mut user) = self.user.lock() {
            user.mfa_settings = vec![crate::cognito::user::SOFTWARE_TOKEN_MFA.to_string()];
            user.preferred_mfa_setting = Some(crate::cognito::user::SOFTWARE_TOKEN_MFA.to_string());
        }
        Ok(())
    }
}

/// Token set the mock hands out on a successful code exchange
#[must_use]
pub fn issued_tokens(id_token: String) -> TokenSet {
    TokenSet {
        id_token,
        access_token: TEST_ACCESS_TOKEN.to_string(),
        refresh_token: Some(TEST_REFRESH_TOKEN.to_string()),
        expires_in: 3600,
        token_type: "Bearer".to_string(),
    }
}
