#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use actix_web::{middleware::Logger, web, App, HttpServer};
use cognito_gate::{
    build_session_manager, configure_services, settings::AppSettings,
    utils::logging::LoggingHelper,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = AppSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    settings
        .validate()
        .map_err(|e| std::io::Error::other(format!("Invalid configuration: {e}")))?;

    start_server(settings).await
}

/// Start the HTTP server
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(settings: AppSettings) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    LoggingHelper::log_startup(&settings);

    let session_manager = build_session_manager(&settings);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(settings.clone()))
            .app_data(web::Data::new(session_manager.clone()))
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .bind(&bind_address)?
    .run()
    .await
}
