//! Database configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// PostgreSQL pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://` or `postgresql://` connection URL
    pub url: String,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a free connection
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,

    /// Apply the embedded migrations before serving
    #[serde(default)]
    pub run_migrations: bool,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    /// The URL with any password replaced, safe to log.
    pub fn redacted_url(&self) -> String {
        let Some((scheme, rest)) = self.url.split_once("://") else {
            return self.url.clone();
        };
        let Some((credentials, host)) = rest.rsplit_once('@') else {
            return self.url.clone();
        };
        match credentials.split_once(':') {
            Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
            None => self.url.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("DATABASE__URL"));
        }
        if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
            return Err(ValidationError::InvalidDatabaseUrl);
        }
        if self.min_connections > self.max_connections {
            return Err(ValidationError::InvalidPoolSize);
        }
        if self.max_connections > 100 {
            return Err(ValidationError::PoolSizeTooLarge);
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            min_connections: default_min_connections(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            run_migrations: false,
        }
    }
}

fn default_min_connections() -> u32 {
    2
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    5
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_max_lifetime() -> u64 {
    1800
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_url(url: &str) -> DatabaseConfig {
        DatabaseConfig {
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_database_config_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout(), Duration::from_secs(5));
        assert!(!config.run_migrations);
    }

    #[test]
    fn test_validation_missing_url() {
        assert!(matches!(
            DatabaseConfig::default().validate(),
            Err(ValidationError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_validation_rejects_other_schemes() {
        assert!(matches!(
            with_url("mysql://localhost/market").validate(),
            Err(ValidationError::InvalidDatabaseUrl)
        ));
    }

    #[test]
    fn test_validation_pool_bounds() {
        let config = DatabaseConfig {
            min_connections: 10,
            max_connections: 5,
            ..with_url("postgres://localhost/market")
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidPoolSize)));

        let config = DatabaseConfig {
            max_connections: 150,
            ..with_url("postgres://localhost/market")
        };
        assert!(matches!(config.validate(), Err(ValidationError::PoolSizeTooLarge)));
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(with_url("postgresql://chat:pw@db:5432/market").validate().is_ok());
    }

    #[test]
    fn test_redacted_url_hides_password() {
        let config = with_url("postgres://chat:hunter2@db:5432/market");
        assert_eq!(config.redacted_url(), "postgres://chat:***@db:5432/market");
    }

    #[test]
    fn test_redacted_url_without_password_is_unchanged() {
        let config = with_url("postgres://db/market");
        assert_eq!(config.redacted_url(), "postgres://db/market");
    }
}
