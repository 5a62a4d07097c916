//! API Middleware
//!
//! Middleware layers for authentication and role-based authorization.

pub mod auth;
pub mod roles;

pub use auth::{require_auth, AuthUser, JwtState};
pub use roles::{require_role, RoleGate};
