//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables use the `MARKETCHAT` prefix and
//! `__` between nesting levels.
//!
//! # Example
//!
//! ```no_run
//! use marketchat::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod database;
mod error;
mod realtime;
mod server;

pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use realtime::RealtimeConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Bind address, environment, logging, HTTP limits
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL pool
    pub database: DatabaseConfig,

    /// Session token verification
    pub auth: AuthConfig,

    /// Websocket chat behaviour
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` if present, then reads `MARKETCHAT__*` variables:
    ///
    /// - `MARKETCHAT__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `MARKETCHAT__DATABASE__URL=...` -> `database.url = ...`
    /// - `MARKETCHAT__AUTH__JWT_SECRET=...` -> `auth.jwt_secret = ...`
    /// - `MARKETCHAT__REALTIME__ERROR_EVENTS=true` -> `realtime.error_events = true`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("MARKETCHAT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.auth.validate(&self.server.environment)?;
        self.realtime.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
