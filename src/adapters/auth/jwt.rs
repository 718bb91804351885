//! HS256 session token validator.
//!
//! Session tokens are JWTs signed with a shared secret. The same token is
//! accepted by the REST middleware and by the realtime channel gate.
//!
//! # Claims
//!
//! | Claim   | Required | Meaning                     |
//! |---------|----------|-----------------------------|
//! | `sub`   | yes      | user id                     |
//! | `exp`   | yes      | expiry, Unix seconds        |
//! | `email` | yes      | account email               |
//! | `name`  | no       | display name                |
//! | `iss`   | if configured | issuing service        |

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::config::AuthConfig;
use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

#[derive(Debug, Deserialize)]
#[cfg_attr(test, derive(serde::Serialize))]
struct SessionClaims {
    sub: String,
    exp: i64,
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iss: Option<String>,
}

/// Validates HS256 session tokens.
pub struct JwtSessionValidator {
    decoding_key: DecodingKey,
    issuer: Option<String>,
}

impl JwtSessionValidator {
    pub fn new(secret: &[u8], issuer: Option<String>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            issuer,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.jwt_secret.expose_secret().as_bytes(),
            config.issuer.clone(),
        )
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation()).map_err(
            |e| {
                use jsonwebtoken::errors::ErrorKind;
                match e.kind() {
                    ErrorKind::ExpiredSignature => {
                        tracing::debug!("Session token expired");
                        AuthError::TokenExpired
                    }
                    ErrorKind::InvalidIssuer => {
                        tracing::warn!("Invalid issuer in session token");
                        AuthError::InvalidToken
                    }
                    _ => {
                        tracing::debug!("Session token rejected: {}", e);
                        AuthError::InvalidToken
                    }
                }
            },
        )?;
        let claims = data.claims;

        let email = claims.email.ok_or_else(|| {
            tracing::warn!("Session token missing email claim");
            AuthError::InvalidToken
        })?;

        let user_id = UserId::new(&claims.sub).map_err(|_| {
            tracing::warn!("Invalid user ID in session token");
            AuthError::InvalidToken
        })?;

        Ok(AuthenticatedUser::new(user_id, email, claims.name))
    }
}

impl std::fmt::Debug for JwtSessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSessionValidator")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}
