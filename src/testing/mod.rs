//! Testing utilities for cognito-gate
//!
//! Shared by the unit tests and by the integration tests under `tests/`
//! (which enable the `testing` feature).
//!
//! ## Organization
//!
//! - [`fixtures`] - Pre-built settings, session managers and session cookies
//! - [`mock`] - In-memory [`IdentityProvider`](crate::cognito::IdentityProvider)
//! - [`tokens`] - RS256 identity tokens signed with a fixed test key
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cognito_gate::testing::{IdTokenBuilder, MockIdentityProvider, TestFixtures};
//!
//! let settings = TestFixtures::settings();
//! let provider = std::sync::Arc::new(MockIdentityProvider::new());
//! let token = IdTokenBuilder::new(&settings.cognito).expired().build();
//! ```

pub mod fixtures;
pub mod mock;
pub mod tokens;

pub use fixtures::TestFixtures;
pub use mock::{MockIdentityProvider, VerifyOutcome};
pub use tokens::IdTokenBuilder;

/// Common test constants
pub mod constants {
    pub const TEST_CLIENT_ID: &str = "test-client-id";
    pub const TEST_USER_POOL_ID: &str = "us-east-1_TestPool";
    pub const TEST_AUTH_DOMAIN: &str = "https://auth.example.com";
    pub const TEST_REDIRECT_URI: &str = "http://localhost:8080/callback";
    pub const TEST_LOGOUT_REDIRECT_URI: &str = "http://localhost:8080/loggedout";

    pub const TEST_SUB: &str = "7f3c9a52-1d2e-4b6f-9a0c-3e5d8b1f2a4c";
    pub const TEST_USERNAME: &str = "jdoe";
    pub const TEST_GIVEN_NAME: &str = "Jane";
    pub const TEST_FAMILY_NAME: &str = "Doe";
    pub const TEST_EMAIL: &str = "jane.doe@example.com";

    pub const TEST_ACCESS_TOKEN: &str = "test-access-token";
    pub const TEST_REFRESH_TOKEN: &str = "test-refresh-token";
    pub const REFRESHED_ACCESS_TOKEN: &str = "refreshed-access-token";
    pub const TEST_TOTP_SECRET: &str = "JBSWY3DPEHPK3PXP";
}
