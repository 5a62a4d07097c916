//! Bearer-token authentication middleware
//!
//! Extracts the session token from the Authorization header, validates it and
//! makes the caller's identity available to handlers via Axum's Extension.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use frontdesk_auth::{Role, TokenError, TokenService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::models::ErrorResponse;

/// Authenticated user context extracted from the session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
    pub role: Role,
}

/// Token validation state shared across middleware instances
#[derive(Clone)]
pub struct JwtState {
    pub tokens: Arc<TokenService>,
}

impl JwtState {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

fn unauthorized(error: impl Into<String>, code: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: error.into(),
            code: Some(code.to_string()),
        }),
    )
}

/// Authentication middleware that validates session tokens
///
/// Reset tokens are signed with a different key and are rejected here like
/// any other bad signature.
///
/// # Errors
/// Returns 401 Unauthorized if:
/// - The Authorization header is missing or not `Bearer <token>`
/// - The token is malformed, signed with another key, or expired
pub async fn require_auth(
    State(state): State<Arc<JwtState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| unauthorized("Missing Authorization header", "MISSING_AUTH"))?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        unauthorized(
            "Invalid Authorization header format. Expected 'Bearer <token>'",
            "INVALID_AUTH_FORMAT",
        )
    })?;

    let claims = state.tokens.validate_session(token).map_err(|e| {
        debug!("Rejected session token: {}", e);
        match e {
            TokenError::TokenExpired => unauthorized("Token expired", "TOKEN_EXPIRED"),
            _ => unauthorized("Invalid or expired token", "INVALID_TOKEN"),
        }
    })?;

    let auth_user = AuthUser {
        user_id: claims.user_id,
        email: claims.email,
        role: claims.role,
    };

    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, middleware, routing::get, Router};
    use chrono::{Duration, Utc};
    use tower::ServiceExt; // For oneshot()

    const SECRET: &[u8] = b"test-secret-key";

    async fn protected_handler(axum::Extension(user): axum::Extension<AuthUser>) -> Json<AuthUser> {
        Json(user)
    }

    fn create_test_app(tokens: Arc<TokenService>) -> Router {
        let jwt_state = Arc::new(JwtState::new(tokens));

        Router::new()
            .route("/protected", get(protected_handler))
            .layer(middleware::from_fn_with_state(jwt_state, require_auth))
    }

    async fn call(app: Router, authorization: Option<String>) -> Response {
        let mut builder = Request::builder().uri("/protected");
        if let Some(value) = authorization {
            builder = builder.header("Authorization", value);
        }
        app.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn error_body(response: Response) -> ErrorResponse {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_valid_session_token() {
        let tokens = Arc::new(TokenService::new(SECRET));
        let issued = tokens
            .issue_session(42, "desk@clinic.test", Role::FrontDesk)
            .unwrap();

        let response = call(
            create_test_app(tokens),
            Some(format!("Bearer {}", issued.token)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let auth_user: AuthUser = serde_json::from_slice(&body).unwrap();

        assert_eq!(auth_user.user_id, 42);
        assert_eq!(auth_user.email, "desk@clinic.test");
        assert_eq!(auth_user.role, Role::FrontDesk);
    }

    #[tokio::test]
    async fn test_missing_authorization_header() {
        let app = create_test_app(Arc::new(TokenService::new(SECRET)));

        let response = call(app, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let error = error_body(response).await;
        assert_eq!(error.code.as_deref(), Some("MISSING_AUTH"));
    }

    #[tokio::test]
    async fn test_invalid_bearer_format() {
        let app = create_test_app(Arc::new(TokenService::new(SECRET)));

        let response = call(app, Some("Token abc.def.ghi".to_string())).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let error = error_body(response).await;
        assert!(error.error.contains("Invalid Authorization header format"));
    }

    #[tokio::test]
    async fn test_expired_token() {
        let tokens = Arc::new(TokenService::new(SECRET));
        let issued = tokens
            .issue_session_at(
                1,
                "doc@clinic.test",
                Role::Clinician,
                Utc::now() - Duration::hours(25),
            )
            .unwrap();

        let response = call(
            create_test_app(tokens),
            Some(format!("Bearer {}", issued.token)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let error = error_body(response).await;
        assert_eq!(error.code.as_deref(), Some("TOKEN_EXPIRED"));
    }

    #[tokio::test]
    async fn test_wrong_secret() {
        let foreign = TokenService::new(b"wrong-secret-key");
        let issued = foreign
            .issue_session(1, "doc@clinic.test", Role::Clinician)
            .unwrap();

        let app = create_test_app(Arc::new(TokenService::new(SECRET)));
        let response = call(app, Some(format!("Bearer {}", issued.token))).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let error = error_body(response).await;
        assert_eq!(error.code.as_deref(), Some("INVALID_TOKEN"));
    }

    #[tokio::test]
    async fn test_reset_token_rejected() {
        let tokens = Arc::new(TokenService::new(SECRET));
        let reset = tokens.issue_reset(1, "desk@clinic.test").unwrap();

        let response = call(
            create_test_app(tokens),
            Some(format!("Bearer {}", reset.token)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
