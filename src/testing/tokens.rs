//! Signed identity tokens for tests
//!
//! Tokens are signed with the RSA key in `test_key.pem`; the matching public
//! key is served by [`MockIdentityProvider`](super::MockIdentityProvider) as
//! the pool's JWKS.

use std::sync::LazyLock;

use base64::Engine as _;
use chrono::Utc;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::{json, Map, Value};
use sha2::Sha256;

use super::constants::{TEST_EMAIL, TEST_FAMILY_NAME, TEST_GIVEN_NAME, TEST_SUB, TEST_USERNAME};
use crate::cognito::{JsonWebKey, JsonWebKeySet};
use crate::settings::CognitoSettings;

pub const TEST_KEY_ID: &str = "test-key-1";

static TEST_KEY: LazyLock<RsaPrivateKey> = LazyLock::new(|| {
    RsaPrivateKey::from_pkcs8_pem(include_str!("test_key.pem"))
        .expect("test_key.pem is a valid PKCS#8 RSA key")
});

fn b64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Public half of the test key as a JWK
#[must_use]
pub fn test_jwk() -> JsonWebKey {
    let public_key = TEST_KEY.to_public_key();
    JsonWebKey {
        kty: "RSA".to_string(),
        kid: Some(TEST_KEY_ID.to_string()),
        alg: Some("RS256".to_string()),
        key_use: Some("sig".to_string()),
        n: Some(b64(&public_key.n().to_bytes_be())),
        e: Some(b64(&public_key.e().to_bytes_be())),
    }
}

#[must_use]
pub fn test_jwks() -> JsonWebKeySet {
    JsonWebKeySet {
        keys: vec![test_jwk()],
    }
}

/// Builder for identity tokens as Cognito would issue them
pub struct IdTokenBuilder {
    claims: Map<String, Value>,
    kid: String,
    alg: String,
}

impl IdTokenBuilder {
    /// A valid token for the test user, expiring in one hour
    #[must_use]
    pub fn new(settings: &CognitoSettings) -> Self {
        let now = Utc::now().timestamp();
        let claims = json!({
            "sub": TEST_SUB,
            "iss": settings.issuer(),
            "aud": settings.client_id,
            "token_use": "id",
            "auth_time": now,
            "iat": now,
            "exp": now + 3600,
            "cognito:username": TEST_USERNAME,
            "given_name": TEST_GIVEN_NAME,
            "family_name": TEST_FAMILY_NAME,
            "email": TEST_EMAIL,
            "email_verified": true,
        });

        Self {
            claims: match claims {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            kid: TEST_KEY_ID.to_string(),
            alg: "RS256".to_string(),
        }
    }

    /// Issued two hours ago, expired one hour ago
    #[must_use]
    pub fn expired(self) -> Self {
        let now = Utc::now().timestamp();
        self.claim("iat", now - 7200).claim("exp", now - 3600)
    }

    #[must_use]
    pub fn claim(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.claims.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    #[must_use]
    pub fn kid(mut self, kid: &str) -> Self {
        self.kid = kid.to_string();
        self
    }

    /// Algorithm advertised in the header; the signature is always RS256
    #[must_use]
    pub fn header_alg(mut self, alg: &str) -> Self {
        self.alg = alg.to_string();
        self
    }

    #[must_use]
    pub fn build(self) -> String {
        let header = json!({"alg": self.alg, "typ": "JWT", "kid": self.kid});
        let signing_input = format!(
            "{}.{}",
            b64(header.to_string().as_bytes()),
            b64(Value::Object(self.claims).to_string().as_bytes())
        );

        let signing_key = SigningKey::<Sha256>::new(TEST_KEY.clone());
        let signature = signing_key.sign(signing_input.as_bytes());

        format!("{signing_input}.{}", b64(&signature.to_bytes()))
    }
}
