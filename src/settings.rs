use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;

/// Scopes requested from the hosted login page when none are configured
pub const DEFAULT_SCOPES: &[&str] = &[
    "openid",
    "profile",
    "email",
    "aws.cognito.signin.user.admin",
];

/// Upper bound for the session cookie lifetime; browsers cap `Max-Age` at 400 days
pub const MAX_SESSION_DURATION_DAYS: u64 = 400;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppSettings {
    pub application: ApplicationSettings,
    pub cognito: CognitoSettings,
    pub session: SessionSettings,
    pub cookies: CookieSettings,
    pub jwt_validation: JwtValidationConfig,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

/// Cognito user pool and app client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CognitoSettings {
    pub client_id: String,
    /// Only set for app clients generated with a secret
    pub client_secret: Option<String>,
    /// Hosted UI domain including scheme, e.g. `https://auth.example.com`
    pub auth_domain: String,
    pub redirect_uri: String,
    pub logout_redirect_uri: String,
    pub user_pool_id: String,
    /// Falls back to the prefix of `user_pool_id` when empty
    pub region: String,
    pub scopes: Vec<String>,
    /// Replaces the regional JSON API endpoint, e.g. for a local emulator
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Lifetime of the identity and refresh token cookies, in days
    pub session_duration_days: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieSettings {
    pub secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtValidationConfig {
    /// Clock skew tolerance in seconds applied to `exp` and `nbf`
    pub clock_skew_seconds: u64,

    /// JWKS cache duration in seconds (default: 3600 = 1 hour)
    pub cache_duration_seconds: u64,

    /// Minimum spacing between JWKS fetches triggered by unknown key ids
    pub min_fetch_interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for CognitoSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            auth_domain: String::new(),
            redirect_uri: String::new(),
            logout_redirect_uri: String::new(),
            user_pool_id: String::new(),
            region: String::new(),
            scopes: DEFAULT_SCOPES.iter().map(ToString::to_string).collect(),
            endpoint_url: None,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            session_duration_days: 30,
        }
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            secure: true, // Default to secure cookies
        }
    }
}

impl Default for JwtValidationConfig {
    fn default() -> Self {
        Self {
            clock_skew_seconds: 0,
            cache_duration_seconds: 3600,
            min_fetch_interval_seconds: 6,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Logger initialization fails
    /// - Settings file cannot be read or parsed
    pub fn load() -> Result<Self> {
        Self::load_env_file();

        // Load base settings from TOML or defaults
        let mut settings = Self::load_base_settings()?;

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut settings);

        Self::initialize_logger(&settings.logging)?;

        Ok(settings)
    }

    /// Initialize `env_logger`, honouring `RUST_LOG` before the configured level
    fn initialize_logger(logging: &LoggingSettings) -> Result<()> {
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(logging.level.as_str()),
        )
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logger: {e}"))
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `COGNITO_GATE_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file cannot be read or parsed
    fn load_base_settings() -> Result<Self> {
        let mut settings = Self::default();

        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(&default_config_path)?;
            println!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(secrets_dir) = std::env::var("COGNITO_GATE_SECRETS_DIR") {
            let secrets_path = std::path::Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_file(&secrets_path)?;
                println!("✓ Overriding settings from {}", secrets_path.display());
            } else {
                println!(
                    "ℹ COGNITO_GATE_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a TOML settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let toml_content = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read {}: {e}", path.display()))?;
        basic_toml::from_str(&toml_content)
            .map_err(|e| anyhow!("Failed to parse {}: {e}", path.display()))
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_cognito_env_overrides(&mut settings.cognito);
        Self::apply_session_env_overrides(&mut settings.session);
        Self::apply_cookie_env_overrides(&mut settings.cookies);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                app_settings.port = port;
            }
        }
    }

    /// Apply the `COGNITO_*` environment overrides
    pub fn apply_cognito_env_overrides(cognito: &mut CognitoSettings) {
        let string_overrides: [(&str, &mut String); 6] = [
            ("COGNITO_CLIENT_ID", &mut cognito.client_id),
            ("COGNITO_DOMAIN", &mut cognito.auth_domain),
            ("COGNITO_REDIRECT_URI", &mut cognito.redirect_uri),
            ("COGNITO_LOGOUT_REDIRECT_URI", &mut cognito.logout_redirect_uri),
            ("COGNITO_USER_POOL_ID", &mut cognito.user_pool_id),
            ("COGNITO_REGION", &mut cognito.region),
        ];
        for (env_var, target) in string_overrides {
            if let Ok(value) = std::env::var(env_var) {
                *target = value;
            }
        }

        if let Ok(secret) = std::env::var("COGNITO_CLIENT_SECRET") {
            cognito.client_secret = (!secret.is_empty()).then_some(secret);
        }

        if let Ok(url) = std::env::var("COGNITO_ENDPOINT_URL") {
            cognito.endpoint_url = (!url.is_empty()).then_some(url);
        }
    }

    fn apply_session_env_overrides(session_settings: &mut SessionSettings) {
        if let Ok(value_str) = std::env::var("COGNITO_SESSION_DURATION") {
            if let Ok(value) = value_str.parse::<u64>() {
                session_settings.session_duration_days = value;
            }
        }
    }

    fn apply_cookie_env_overrides(cookie_settings: &mut CookieSettings) {
        if let Ok(cookie_secure_str) = std::env::var("COOKIE_SECURE") {
            if let Ok(cookie_secure) = cookie_secure_str.parse::<bool>() {
                cookie_settings.secure = cookie_secure;
            }
        }
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Check that every value needed to talk to Cognito is present
    ///
    /// # Errors
    ///
    /// Returns an error naming every missing setting
    pub fn validate(&self) -> Result<()> {
        let cognito = &self.cognito;
        let required = [
            ("cognito.client_id", cognito.client_id.as_str()),
            ("cognito.auth_domain", cognito.auth_domain.as_str()),
            ("cognito.redirect_uri", cognito.redirect_uri.as_str()),
            (
                "cognito.logout_redirect_uri",
                cognito.logout_redirect_uri.as_str(),
            ),
            ("cognito.user_pool_id", cognito.user_pool_id.as_str()),
        ];

        let mut missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if cognito.region().is_none() {
            missing.push("cognito.region");
        }

        if !missing.is_empty() {
            return Err(anyhow!("Missing required settings: {}", missing.join(", ")));
        }

        let days = self.session.session_duration_days;
        if days == 0 || days > MAX_SESSION_DURATION_DAYS {
            return Err(anyhow!(
                "session.session_duration_days must be between 1 and {MAX_SESSION_DURATION_DAYS}, got {days}"
            ));
        }

        Ok(())
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }
}

impl CognitoSettings {
    /// Region of the user pool, explicit or derived from the pool id (`us-east-1_AbC`)
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        if !self.region.is_empty() {
            return Some(self.region.as_str());
        }
        self.user_pool_id
            .split_once('_')
            .map(|(region, _)| region)
            .filter(|region| !region.is_empty())
    }

    /// Issuer of tokens minted by this user pool
    #[must_use]
    pub fn issuer(&self) -> String {
        format!(
            "https://cognito-idp.{}.amazonaws.com/{}",
            self.region().unwrap_or_default(),
            self.user_pool_id
        )
    }

    /// The pool's published signing keys
    #[must_use]
    pub fn jwks_uri(&self) -> String {
        format!("{}/.well-known/jwks.json", self.issuer())
    }

    /// Endpoint of the user pool's JSON API (`GetUser`, `VerifySoftwareToken`, ...)
    #[must_use]
    pub fn api_endpoint(&self) -> String {
        if let Some(url) = self.endpoint_url.as_deref() {
            return format!("{}/", url.trim_end_matches('/'));
        }
        format!(
            "https://cognito-idp.{}.amazonaws.com/",
            self.region().unwrap_or_default()
        )
    }

    #[must_use]
    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth2/token", self.auth_domain.trim_end_matches('/'))
    }

    /// Space separated scope list sent to the hosted login page
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}
