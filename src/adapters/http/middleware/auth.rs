//! Authentication middleware and extractors for axum.
//!
//! This module provides:
//! - `auth_middleware` - Layer that validates session tokens and injects the user into extensions
//! - `RequireAuth` - Extractor that requires authentication
//! - `session_token` - Token lookup shared with the websocket gate
//!
//! ```text
//! Request → auth_middleware → injects AuthenticatedUser into extensions
//!                                      ↓
//!                              Handler → RequireAuth extractor reads from extensions
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::ports::SessionValidator;

/// Auth middleware state: the validator plus where browsers keep the token.
#[derive(Clone)]
pub struct AuthState {
    pub validator: Arc<dyn SessionValidator>,
    pub session_cookie: String,
}

impl AuthState {
    pub fn new(validator: Arc<dyn SessionValidator>, session_cookie: impl Into<String>) -> Self {
        Self {
            validator,
            session_cookie: session_cookie.into(),
        }
    }
}

/// Finds the session token in a request's headers.
///
/// Looks at `Authorization: Bearer <token>` first, then the session cookie.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Maps a validation failure to the response the client sees.
pub fn auth_error_response(error: &AuthError) -> Response {
    let (status, message) = match error {
        AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Session expired"),
        AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid session"),
        AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Authentication required"),
        AuthError::ServiceUnavailable(msg) => {
            tracing::error!("Session validation unavailable: {}", msg);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Authentication service unavailable",
            )
        }
    };

    (
        status,
        Json(serde_json::json!({
            "success": false,
            "message": message,
        })),
    )
        .into_response()
}

/// Authentication middleware.
///
/// 1. Looks for a session token (Bearer header, then cookie)
/// 2. Validates it through the `SessionValidator` port
/// 3. On success, injects `AuthenticatedUser` into request extensions
/// 4. On missing token, continues without injecting; `RequireAuth` decides
/// 5. On invalid token, returns 401
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = session_token(request.headers(), &auth.session_cookie) else {
        return next.run(request).await;
    };

    match auth.validator.validate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => auth_error_response(&e),
    }
}

/// Extractor that requires authentication.
///
/// ```ignore
/// async fn my_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthenticatedUser);

impl<S> axum::extract::FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .cloned()
                .map(RequireAuth)
                .ok_or(AuthRejection::Unauthenticated)
        })
    }
}

/// Rejection type for authentication failures.
#[derive(Debug, Clone)]
pub enum AuthRejection {
    /// No valid session token was provided.
    Unauthenticated,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::Unauthenticated => auth_error_response(&AuthError::MissingToken),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockSessionValidator;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), value.parse().unwrap());
        }
        map
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Token lookup
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn bearer_header_is_used() {
        let h = headers(&[(header::AUTHORIZATION, "Bearer abc")]);
        assert_eq!(session_token(&h, "session").as_deref(), Some("abc"));
    }

    #[test]
    fn other_schemes_are_ignored() {
        let h = headers(&[(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")]);
        assert_eq!(session_token(&h, "session"), None);
    }

    #[test]
    fn session_cookie_is_used_when_no_header() {
        let h = headers(&[(header::COOKIE, "theme=dark; session=tok123; lang=en")]);
        assert_eq!(session_token(&h, "session").as_deref(), Some("tok123"));
    }

    #[test]
    fn bearer_wins_over_cookie() {
        let h = headers(&[
            (header::AUTHORIZATION, "Bearer from-header"),
            (header::COOKIE, "session=from-cookie"),
        ]);
        assert_eq!(session_token(&h, "session").as_deref(), Some("from-header"));
    }

    #[test]
    fn cookie_name_must_match_exactly() {
        let h = headers(&[(header::COOKIE, "my_session=tok")]);
        assert_eq!(session_token(&h, "session"), None);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Middleware + extractor
    // ════════════════════════════════════════════════════════════════════════════

    fn app() -> Router {
        let validator = Arc::new(MockSessionValidator::new().with_test_user("good", "user-1"));
        Router::new()
            .route(
                "/me",
                get(|RequireAuth(user): RequireAuth| async move { user.id.to_string() }),
            )
            .layer(middleware::from_fn_with_state(
                AuthState::new(validator, "session"),
                auth_middleware,
            ))
    }

    async fn status_for(request: axum::http::Request<Body>) -> StatusCode {
        app().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn valid_token_reaches_handler() {
        let request = axum::http::Request::builder()
            .uri("/me")
            .header(header::AUTHORIZATION, "Bearer good")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_for(request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn valid_cookie_reaches_handler() {
        let request = axum::http::Request::builder()
            .uri("/me")
            .header(header::COOKIE, "session=good")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_for(request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_token_is_rejected_by_extractor() {
        let request = axum::http::Request::builder()
            .uri("/me")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_for(request).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_token_is_rejected_by_middleware() {
        let request = axum::http::Request::builder()
            .uri("/me")
            .header(header::AUTHORIZATION, "Bearer forged")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_for(request).await, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn unavailable_validator_maps_to_503() {
        let response = auth_error_response(&AuthError::service_unavailable("db down"));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn require_auth_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RequireAuth>();
        assert_send_sync::<AuthState>();
    }
}
