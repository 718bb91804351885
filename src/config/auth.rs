//! Authentication configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Minimum HS256 secret length accepted in production.
const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// Session token configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared secret the session tokens are signed with
    pub jwt_secret: SecretString,

    /// Expected `iss` claim; not checked when unset
    pub issuer: Option<String>,

    /// Cookie carrying the session token for browser clients
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
}

impl AuthConfig {
    /// Validate authentication configuration
    ///
    /// Any non-empty secret is accepted in development. Production requires
    /// a secret of at least 32 bytes.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        let secret_len = self.jwt_secret.expose_secret().len();
        if secret_len == 0 {
            return Err(ValidationError::MissingRequired("AUTH__JWT_SECRET"));
        }
        if *environment == Environment::Production && secret_len < MIN_PRODUCTION_SECRET_LEN {
            return Err(ValidationError::WeakJwtSecret(MIN_PRODUCTION_SECRET_LEN));
        }
        if self.session_cookie.trim().is_empty() {
            return Err(ValidationError::EmptyCookieName);
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: SecretString::new(String::new()),
            issuer: None,
            session_cookie: default_session_cookie(),
        }
    }
}

fn default_session_cookie() -> String {
    "session".to_string()
}
