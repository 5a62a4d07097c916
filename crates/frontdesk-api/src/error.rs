//! Mapping of service errors onto HTTP responses

use axum::{http::StatusCode, Json};
use frontdesk_auth::AuthError;
use frontdesk_booking::BookingError;
use sea_orm::DbErr;
use tracing::error;

use crate::models::ErrorResponse;

/// Error half of every handler's return type
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, error: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: Some(code.to_string()),
        }),
    )
}

pub fn bad_request(error: impl Into<String>, code: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, error, code)
}

pub fn not_found(error: impl Into<String>, code: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, error, code)
}

fn internal(detail: impl std::fmt::Display) -> ApiError {
    error!("Internal error: {}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Internal server error".to_string(),
            code: Some("INTERNAL_ERROR".to_string()),
        }),
    )
}

fn timeout() -> ApiError {
    api_error(
        StatusCode::SERVICE_UNAVAILABLE,
        "Request did not complete in time",
        "TIMEOUT",
    )
}

pub fn db_error(err: DbErr) -> ApiError {
    internal(format!("Database error: {}", err))
}

pub fn auth_error(err: AuthError) -> ApiError {
    match err {
        AuthError::InvalidCredentials => api_error(
            StatusCode::UNAUTHORIZED,
            err.to_string(),
            "INVALID_CREDENTIALS",
        ),
        AuthError::Deactivated => {
            api_error(StatusCode::FORBIDDEN, err.to_string(), "ACCOUNT_DEACTIVATED")
        }
        AuthError::NotFound => not_found(err.to_string(), "USER_NOT_FOUND"),
        AuthError::DuplicateHandle => bad_request(err.to_string(), "EMAIL_EXISTS"),
        AuthError::InvalidRole(_) => bad_request(err.to_string(), "INVALID_ROLE"),
        AuthError::WeakPassword { .. } => bad_request(err.to_string(), "WEAK_PASSWORD"),
        AuthError::IncorrectCurrentPassword => {
            bad_request(err.to_string(), "INCORRECT_PASSWORD")
        }
        AuthError::InvalidOrExpiredResetToken => {
            bad_request(err.to_string(), "INVALID_RESET_TOKEN")
        }
        AuthError::TokenInvalid => {
            api_error(StatusCode::UNAUTHORIZED, err.to_string(), "INVALID_TOKEN")
        }
        AuthError::Timeout => timeout(),
        AuthError::TokenIssuance(_) | AuthError::Storage(_) | AuthError::HashingFailure(_) => {
            internal(err)
        }
    }
}

pub fn booking_error(err: BookingError) -> ApiError {
    match err {
        BookingError::SlotUnavailable => {
            api_error(StatusCode::CONFLICT, err.to_string(), "SLOT_UNAVAILABLE")
        }
        BookingError::NotFound => not_found("Appointment not found", "APPOINTMENT_NOT_FOUND"),
        BookingError::Timeout => timeout(),
        BookingError::Storage(_) => internal(err),
    }
}
