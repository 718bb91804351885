//! HTTP middleware for axum.
//!
//! - `auth` - Session authentication middleware and extractors

pub mod auth;

pub use auth::{
    auth_error_response, auth_middleware, session_token, AuthRejection, AuthState, RequireAuth,
};
