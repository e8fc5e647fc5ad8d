// Identity token validation against the user pool's JWKS
// Keys are cached and refetched on expiry or on an unknown key id (rate limited)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use rsa::{pkcs1v15::VerifyingKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::sync::{Mutex, RwLock};

use super::IdentityProvider;
use crate::settings::{AppSettings, JwtValidationConfig};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug)]
pub enum JwtValidationError {
    KeyNotFound(String),
    SignatureInvalid,
    ClaimValidationFailed {
        claim: String,
        expected: String,
        actual: String,
    },
    JwksFetchFailed(String),
    UnsupportedAlgorithm(String),
    TokenExpired,
    TokenNotYetValid,
    InvalidToken(String),
    KeyDecodingFailed(String),
    CryptographicError(String),
}

impl std::fmt::Display for JwtValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyNotFound(kid) => write!(f, "Key not found: {kid}"),
            Self::SignatureInvalid => write!(f, "JWT signature verification failed"),
            Self::ClaimValidationFailed {
                claim,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Claim '{claim}' validation failed: expected '{expected}', got '{actual}'"
                )
            }
            Self::JwksFetchFailed(msg) => write!(f, "Failed to fetch JWKS: {msg}"),
            Self::UnsupportedAlgorithm(alg) => write!(f, "Unsupported algorithm: {alg}"),
            Self::TokenExpired => write!(f, "Token has expired"),
            Self::TokenNotYetValid => write!(f, "Token is not yet valid"),
            Self::InvalidToken(msg) => write!(f, "Invalid token: {msg}"),
            Self::KeyDecodingFailed(msg) => write!(f, "Failed to decode key: {msg}"),
            Self::CryptographicError(msg) => write!(f, "Cryptographic error: {msg}"),
        }
    }
}

impl std::error::Error for JwtValidationError {}

// ============================================================================
// JWT Structures
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: Option<String>,
    pub kid: Option<String>,
}

/// Claims of a Cognito identity token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityTokenClaims {
    pub sub: String,
    pub iss: String,
    /// Audience (string or array)
    pub aud: serde_json::Value,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_use: Option<String>,
    #[serde(
        rename = "cognito:username",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Every other claim, kept for display
    #[serde(flatten)]
    pub additional: serde_json::Map<String, serde_json::Value>,
}

impl IdentityTokenClaims {
    /// Audience values, whether `aud` is a single string or an array
    #[must_use]
    pub fn audiences(&self) -> Vec<String> {
        match &self.aud {
            serde_json::Value::String(aud) => vec![aud.clone()],
            serde_json::Value::Array(values) => values
                .iter()
                .filter_map(|v| v.as_str().map(ToString::to_string))
                .collect(),
            _ => vec![],
        }
    }
}

// ============================================================================
// JWKS Structures
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct JsonWebKeySet {
    pub keys: Vec<JsonWebKey>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct JsonWebKey {
    pub kty: String,         // Key type
    pub kid: Option<String>, // Key ID
    pub alg: Option<String>, // Algorithm
    #[serde(rename = "use")]
    pub key_use: Option<String>, // "sig" for signing

    // RSA keys
    pub n: Option<String>, // Modulus
    pub e: Option<String>, // Exponent
}

// ============================================================================
// JWKS Cache
// ============================================================================

pub struct JwksCache {
    // Key ID -> JsonWebKey
    keys: HashMap<String, JsonWebKey>,

    // When the keys were last fetched
    last_updated: Option<DateTime<Utc>>,

    // Last fetch attempt, successful or not, for rate limiting
    last_attempt: Option<DateTime<Utc>>,

    // Failed fetch tracking for backoff
    last_failure: Option<DateTime<Utc>>,

    // Configuration
    cache_duration: Duration,
    retry_backoff: Duration,
    min_fetch_interval: Duration,
}

impl Default for JwksCache {
    fn default() -> Self {
        Self::new()
    }
}

impl JwksCache {
    /// Create a new JWKS cache with default settings
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: HashMap::new(),
            last_updated: None,
            last_attempt: None,
            last_failure: None,
            cache_duration: Duration::from_secs(3600), // 1 hour default
            retry_backoff: Duration::from_secs(300),   // 5 minutes default
            min_fetch_interval: Duration::from_secs(6), // ~10 fetches per minute
        }
    }

    #[must_use]
    pub fn with_cache_duration(mut self, duration: Duration) -> Self {
        self.cache_duration = duration;
        self
    }

    #[must_use]
    pub fn with_min_fetch_interval(mut self, interval: Duration) -> Self {
        self.min_fetch_interval = interval;
        self
    }

    fn elapsed_since(instant: Option<DateTime<Utc>>) -> Option<Duration> {
        instant.map(|at| {
            Utc::now()
                .signed_duration_since(at)
                .to_std()
                .unwrap_or(Duration::ZERO)
        })
    }

    /// Check if cached keys are still fresh
    #[must_use]
    pub fn is_cache_valid(&self) -> bool {
        Self::elapsed_since(self.last_updated).is_some_and(|elapsed| elapsed < self.cache_duration)
    }

    /// Check whether a fetch may be attempted now
    ///
    /// Failed fetches back off for `retry_backoff`; any other fetch waits at
    /// least `min_fetch_interval` after the previous attempt.
    #[must_use]
    pub fn may_fetch(&self) -> bool {
        if Self::elapsed_since(self.last_failure).is_some_and(|elapsed| elapsed < self.retry_backoff)
        {
            return false;
        }
        Self::elapsed_since(self.last_attempt)
            .map_or(true, |elapsed| elapsed >= self.min_fetch_interval)
    }

    /// Get a key by key ID, regardless of freshness
    #[must_use]
    pub fn get_key(&self, kid: &str) -> Option<&JsonWebKey> {
        self.keys.get(kid)
    }

    /// Replace the cached key set
    pub fn store_keys(&mut self, keys: Vec<JsonWebKey>) {
        self.keys = keys
            .into_iter()
            .filter_map(|key| key.kid.clone().map(|kid| (kid, key)))
            .collect();

        debug!("💾 Cached {} signing keys", self.keys.len());
        self.last_updated = Some(Utc::now());
        self.last_failure = None;
    }

    pub fn record_fetch_attempt(&mut self) {
        self.last_attempt = Some(Utc::now());
    }

    /// Record a failed fetch attempt
    pub fn record_fetch_failure(&mut self) {
        self.last_failure = Some(Utc::now());
    }
}

// ============================================================================
// JWT Validator
// ============================================================================

/// What a token from this user pool must assert
#[derive(Debug, Clone)]
pub struct TokenExpectations {
    pub issuer: String,
    pub audience: String,
    pub token_use: String,
    pub clock_skew_seconds: u64,
}

#[derive(Clone)]
pub struct JwtValidator {
    cache: Arc<RwLock<JwksCache>>,
    // Serializes fetches so concurrent misses share one request
    fetch_lock: Arc<Mutex<()>>,
    expectations: TokenExpectations,
}

impl JwtValidator {
    #[must_use]
    pub fn new(expectations: TokenExpectations, config: &JwtValidationConfig) -> Self {
        Self {
            cache: Arc::new(RwLock::new(
                JwksCache::new()
                    .with_cache_duration(Duration::from_secs(config.cache_duration_seconds))
                    .with_min_fetch_interval(Duration::from_secs(
                        config.min_fetch_interval_seconds,
                    )),
            )),
            fetch_lock: Arc::new(Mutex::new(())),
            expectations,
        }
    }

    /// Validator for identity tokens issued to the configured app client
    #[must_use]
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(
            TokenExpectations {
                issuer: settings.cognito.issuer(),
                audience: settings.cognito.client_id.clone(),
                token_use: "id".to_string(),
                clock_skew_seconds: settings.jwt_validation.clock_skew_seconds,
            },
            &settings.jwt_validation,
        )
    }

    /// Populate the key cache without going to the network
    pub async fn seed_keys(&self, keys: Vec<JsonWebKey>) {
        self.cache.write().await.store_keys(keys);
    }

    /// Fetch the key set from the provider and cache it
    ///
    /// # Errors
    /// Returns error if a fetch is not allowed yet or the JWKS cannot be fetched
    pub async fn fetch_and_cache_jwks(
        &self,
        provider: &dyn IdentityProvider,
    ) -> Result<(), JwtValidationError> {
        {
            let mut cache = self.cache.write().await;
            if !cache.may_fetch() {
                return Err(JwtValidationError::JwksFetchFailed(
                    "Skipping fetch due to rate limit or recent failure".to_string(),
                ));
            }
            cache.record_fetch_attempt();
        }

        debug!("🔑 Fetching JWKS for user pool");

        // No lock is held across the HTTP request
        match provider.fetch_jwks().await {
            Ok(jwks) => {
                self.cache.write().await.store_keys(jwks.keys);
                Ok(())
            }
            Err(e) => {
                self.cache.write().await.record_fetch_failure();
                Err(JwtValidationError::JwksFetchFailed(e.to_string()))
            }
        }
    }

    /// Get a public key for token verification
    ///
    /// # Errors
    /// Returns error if key cannot be found or JWKS cannot be fetched
    pub async fn get_public_key(
        &self,
        kid: &str,
        provider: &dyn IdentityProvider,
    ) -> Result<JsonWebKey, JwtValidationError> {
        {
            let cache = self.cache.read().await;
            if cache.is_cache_valid() {
                if let Some(key) = cache.get_key(kid) {
                    debug!("🎯 Found cached key '{kid}'");
                    return Ok(key.clone());
                }
            }
        }

        // Expired cache or unknown kid
        let _fetching = self.fetch_lock.lock().await;
        {
            // Another request may have fetched while we waited
            let cache = self.cache.read().await;
            if cache.is_cache_valid() {
                if let Some(key) = cache.get_key(kid) {
                    return Ok(key.clone());
                }
            }
        }
        let fetch_result = self.fetch_and_cache_jwks(provider).await;

        let cache = self.cache.read().await;
        if let Some(key) = cache.get_key(kid) {
            if let Err(e) = fetch_result {
                warn!("Using stale signing key '{kid}': {e}");
            }
            return Ok(key.clone());
        }

        match fetch_result {
            Ok(()) => Err(JwtValidationError::KeyNotFound(kid.to_string())),
            Err(e) => Err(e),
        }
    }

    /// Validate a Cognito identity token
    ///
    /// The signature, issuer, audience and token use are checked before
    /// expiry, so [`JwtValidationError::TokenExpired`] means the token is
    /// otherwise genuine.
    ///
    /// # Errors
    /// Returns error if token is invalid, signature verification fails, or claims validation fails
    pub async fn validate_id_token(
        &self,
        token: &str,
        provider: &dyn IdentityProvider,
    ) -> Result<IdentityTokenClaims, JwtValidationError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(JwtValidationError::InvalidToken(
                "Invalid JWT format".to_string(),
            ));
        }

        let header = Self::decode_jwt_header(parts[0])?;
        debug!("📋 JWT header: alg={}, kid={:?}", header.alg, header.kid);

        if header.alg != "RS256" {
            return Err(JwtValidationError::UnsupportedAlgorithm(header.alg));
        }

        let kid = header
            .kid
            .as_deref()
            .ok_or_else(|| JwtValidationError::InvalidToken("Missing key ID".to_string()))?;

        let public_key = self.get_public_key(kid, provider).await?;

        let signing_input = format!("{}.{}", parts[0], parts[1]);
        let signature = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(parts[2])
            .map_err(|e| {
                JwtValidationError::InvalidToken(format!("Invalid signature encoding: {e}"))
            })?;
        Self::verify_rsa_signature(&signing_input, &signature, &public_key)?;
        debug!("✅ JWT signature verified successfully");

        let claims = Self::decode_jwt_claims(parts[1])?;
        self.validate_claims(&claims, Utc::now().timestamp())?;

        Ok(claims)
    }

    /// Decode JWT header from base64
    fn decode_jwt_header(header_b64: &str) -> Result<JwtHeader, JwtValidationError> {
        let header_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|e| {
                JwtValidationError::InvalidToken(format!("Invalid header encoding: {e}"))
            })?;

        serde_json::from_slice(&header_bytes)
            .map_err(|e| JwtValidationError::InvalidToken(format!("Invalid header JSON: {e}")))
    }

    /// Decode JWT claims from base64
    fn decode_jwt_claims(claims_b64: &str) -> Result<IdentityTokenClaims, JwtValidationError> {
        let claims_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|e| {
                JwtValidationError::InvalidToken(format!("Invalid claims encoding: {e}"))
            })?;

        serde_json::from_slice(&claims_bytes)
            .map_err(|e| JwtValidationError::InvalidToken(format!("Invalid claims JSON: {e}")))
    }

    /// Verify an RS256 signature (PKCS#1 v1.5 with SHA-256)
    fn verify_rsa_signature(
        signing_input: &str,
        signature: &[u8],
        public_key: &JsonWebKey,
    ) -> Result<(), JwtValidationError> {
        use rsa::signature::Verifier;

        if public_key.kty != "RSA" {
            return Err(JwtValidationError::KeyDecodingFailed(format!(
                "Expected an RSA key, got {}",
                public_key.kty
            )));
        }

        let n = public_key.n.as_ref().ok_or_else(|| {
            JwtValidationError::KeyDecodingFailed("Missing RSA modulus (n)".to_string())
        })?;
        let e = public_key.e.as_ref().ok_or_else(|| {
            JwtValidationError::KeyDecodingFailed("Missing RSA exponent (e)".to_string())
        })?;

        let n_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(n)
            .map_err(|e| {
                JwtValidationError::KeyDecodingFailed(format!("Invalid modulus encoding: {e}"))
            })?;
        let e_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(e)
            .map_err(|e| {
                JwtValidationError::KeyDecodingFailed(format!("Invalid exponent encoding: {e}"))
            })?;

        let rsa_key = RsaPublicKey::new(
            rsa::BigUint::from_bytes_be(&n_bytes),
            rsa::BigUint::from_bytes_be(&e_bytes),
        )
        .map_err(|e| JwtValidationError::KeyDecodingFailed(format!("Invalid RSA key: {e}")))?;

        let signature = rsa::pkcs1v15::Signature::try_from(signature).map_err(|e| {
            JwtValidationError::CryptographicError(format!("Invalid signature format: {e}"))
        })?;

        VerifyingKey::<Sha256>::new(rsa_key)
            .verify(signing_input.as_bytes(), &signature)
            .map_err(|_| JwtValidationError::SignatureInvalid)
    }

    /// Validate claims; expiry is checked last
    fn validate_claims(
        &self,
        claims: &IdentityTokenClaims,
        now: i64,
    ) -> Result<(), JwtValidationError> {
        let expected = &self.expectations;
        let clock_skew = i64::try_from(expected.clock_skew_seconds).unwrap_or(0);

        if claims.iss != expected.issuer {
            return Err(JwtValidationError::ClaimValidationFailed {
                claim: "iss".to_string(),
                expected: expected.issuer.clone(),
                actual: claims.iss.clone(),
            });
        }

        let audiences = claims.audiences();
        if !audiences.iter().any(|aud| *aud == expected.audience) {
            return Err(JwtValidationError::ClaimValidationFailed {
                claim: "aud".to_string(),
                expected: expected.audience.clone(),
                actual: format!("{audiences:?}"),
            });
        }

        if let Some(token_use) = &claims.token_use {
            if *token_use != expected.token_use {
                return Err(JwtValidationError::ClaimValidationFailed {
                    claim: "token_use".to_string(),
                    expected: expected.token_use.clone(),
                    actual: token_use.clone(),
                });
            }
        }

        if let Some(nbf) = claims.nbf {
            if now < nbf - clock_skew {
                return Err(JwtValidationError::TokenNotYetValid);
            }
        }

        if now > claims.exp + clock_skew {
            return Err(JwtValidationError::TokenExpired);
        }

        Ok(())
    }
}
