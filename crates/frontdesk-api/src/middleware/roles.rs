//! Role gates for route groups
//!
//! Applied with `route_layer` inside the authenticated router, so the
//! [`AuthUser`] extension is always present by the time a gate runs.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Json,
};
use frontdesk_auth::{authorize, Decision, Role};
use tracing::warn;

use super::auth::AuthUser;
use crate::models::ErrorResponse;

/// Roles allowed through a gate
#[derive(Debug, Clone, Copy)]
pub struct RoleGate {
    allowed: &'static [Role],
}

impl RoleGate {
    pub const fn new(allowed: &'static [Role]) -> Self {
        Self { allowed }
    }

    pub const FRONT_DESK: RoleGate = RoleGate::new(&[Role::FrontDesk]);

    pub const STAFF: RoleGate = RoleGate::new(&[Role::FrontDesk, Role::Clinician]);
}

pub async fn require_role(
    State(gate): State<RoleGate>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let Some(user) = request.extensions().get::<AuthUser>() else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Authentication required".to_string(),
                code: Some("MISSING_AUTH".to_string()),
            }),
        ));
    };

    if authorize(user.role, gate.allowed) == Decision::Deny {
        warn!(
            user_id = user.user_id,
            role = %user.role,
            path = %request.uri().path(),
            "Role not permitted"
        );
        return Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                error: format!("Role '{}' is not permitted to perform this action", user.role),
                code: Some("FORBIDDEN".to_string()),
            }),
        ));
    }

    Ok(next.run(request).await)
}
