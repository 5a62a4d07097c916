//! Authentication and account handlers

use axum::{extract::State, http::StatusCode, Extension, Json};
use std::sync::Arc;
use tracing::{debug, info};

use frontdesk_auth::MIN_PASSWORD_LENGTH;

use crate::delivery;
use crate::error::{api_error, auth_error, bad_request, ApiError};
use crate::middleware::AuthUser;
use crate::models::*;
use crate::AppState;

/// Loose email shape check: one `@`, non-empty local part, dotted domain
pub(crate) fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

/// Register a new staff account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Invalid input or email already registered", body = ErrorResponse),
        (status = 403, description = "Self-registration is disabled", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    if !state.allow_signup {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "Self-registration is disabled",
            "SIGNUP_DISABLED",
        ));
    }

    if !looks_like_email(&req.email) {
        return Err(bad_request("Invalid email address", "INVALID_EMAIL"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(bad_request(
            format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
            "WEAK_PASSWORD",
        ));
    }
    if req.name.trim().is_empty() {
        return Err(bad_request("Name is required", "INVALID_NAME"));
    }

    let profile = state
        .auth
        .register(
            &req.email,
            &req.password,
            req.name.trim(),
            &req.role,
            state.request_timeout,
        )
        .await
        .map_err(auth_error)?;

    let issued = state
        .auth
        .tokens()
        .issue_session(profile.id, &profile.email, profile.role)
        .map_err(|e| auth_error(e.into()))?;

    info!(user_id = profile.id, "Account registered via API");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: profile.into(),
            token: issued.token,
            expires_at: issued.expires_at,
        }),
    ))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (issued, profile) = state
        .auth
        .login(&req.email, &req.password, state.request_timeout)
        .await
        .map_err(auth_error)?;

    Ok(Json(LoginResponse {
        user: profile.into(),
        token: issued.token,
        expires_at: issued.expires_at,
    }))
}

/// Get the authenticated user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "User no longer exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<User>, ApiError> {
    let profile = state
        .auth
        .profile(user.user_id)
        .await
        .map_err(auth_error)?;
    Ok(Json(profile.into()))
}

/// Issue a fresh session token
///
/// The presented token stays valid until its own expiry.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "New session token", body = TokenResponse),
        (status = 403, description = "Account deactivated", body = ErrorResponse),
        (status = 404, description = "User no longer exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<TokenResponse>, ApiError> {
    let issued = state
        .auth
        .refresh_token(user.user_id)
        .await
        .map_err(auth_error)?;

    Ok(Json(TokenResponse {
        token: issued.token,
        expires_at: issued.expires_at,
    }))
}

/// Change the authenticated user's password
#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Current password incorrect or new password too short", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .auth
        .change_password(user.user_id, &req.current_password, &req.new_password)
        .await
        .map_err(auth_error)?;

    Ok(Json(MessageResponse::new("Password changed successfully")))
}

/// Request a password reset
///
/// Responds identically whether or not the email belongs to an active account.
/// A token, when issued, goes to the configured delivery channel only.
#[utoipa::path(
    post,
    path = "/api/auth/password-reset",
    request_body = PasswordResetRequest,
    responses(
        (status = 202, description = "Reset requested", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PasswordResetRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let issued = state
        .auth
        .reset_password(&req.email)
        .await
        .map_err(auth_error)?;
    debug!(issued = issued.is_some(), "Password reset requested");

    if let Some(token) = issued {
        delivery::dispatch(state.reset_delivery.clone(), req.email, token);
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse::new(
            "If the account exists, reset instructions have been sent",
        )),
    ))
}

/// Set a new password using a reset token
#[utoipa::path(
    post,
    path = "/api/auth/password-reset/confirm",
    request_body = PasswordResetConfirmRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Invalid or expired reset token, or password too short", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn confirm_password_reset(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PasswordResetConfirmRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .auth
        .confirm_password_reset(&req.token, &req.new_password)
        .await
        .map_err(auth_error)?;

    Ok(Json(MessageResponse::new("Password updated successfully")))
}
