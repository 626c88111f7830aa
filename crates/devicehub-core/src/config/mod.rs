//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! `config/default.toml`, an environment overlay, and `DEVICEHUB__*`
//! environment variables. Each sub-module is one configuration section.

pub mod app;
pub mod database;
pub mod identity;
pub mod logging;
pub mod realtime;
pub mod session;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::database::DatabaseConfig;
pub use self::identity::IdentityConfig;
pub use self::logging::LoggingConfig;
pub use self::realtime::RealtimeConfig;
pub use self::session::SessionConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Identity provider settings.
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Device session limits.
    #[serde(default)]
    pub session: SessionConfig,
    /// Live channel settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration for the given environment name.
    ///
    /// Merges `config/default`, `config/{env}` and environment variables
    /// prefixed with `DEVICEHUB__`, then validates the result.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("DEVICEHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors.allowed_origins")
                    .with_list_parse_key("server.cors.allowed_methods")
                    .with_list_parse_key("identity.algorithms"),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.session.max_devices == 0 {
            return Err(AppError::configuration(
                "session.max_devices must be at least 1",
            ));
        }
        if self.identity.audience.trim().is_empty() {
            return Err(AppError::configuration("identity.audience is required"));
        }
        if self.identity.domain.trim().is_empty() && self.identity.jwks_url.trim().is_empty() {
            return Err(AppError::configuration(
                "identity.domain or identity.jwks_url is required",
            ));
        }
        if self.identity.algorithms.is_empty() {
            return Err(AppError::configuration(
                "identity.algorithms must list at least one algorithm",
            ));
        }
        Ok(())
    }
}
