//! Session handling
//!
//! Sessions live entirely in three cookies holding the Cognito token triple.
//!
//! # Modules
//!
//! - [`cookie`] - Session cookie construction and clearing
//! - [`manager`] - Authentication of requests, including refresh on expiry
//! - [`gate`] - Middleware that guards every non-public route

pub mod cookie;
pub mod gate;
pub mod manager;

pub use cookie::{CookieFactory, CookieOptions};
pub use gate::{is_public_path, session_gate, PUBLIC_PATHS};
pub use manager::{AuthError, Authenticated, SessionManager};
