#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the cognito-gate application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod app;
pub mod cognito;
pub mod error;
pub mod handlers;
pub mod models;
pub mod session;
pub mod settings;
pub mod utils;
pub mod views;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use app::{build_session_manager, configure_services};
pub use cognito::{CognitoClient, IdentityProvider};
pub use error::AppError;
pub use session::SessionManager;
pub use settings::AppSettings;
