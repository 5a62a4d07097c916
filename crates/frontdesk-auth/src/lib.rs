//! Credentials, session tokens and role checks for the front-desk portal

pub mod authz;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod service;
pub mod store;

pub use authz::{authorize, Decision, Role, UnknownRole};
pub use jwt::{IssuedToken, ResetClaims, SessionClaims, TokenError, TokenService};
pub use memory::MemoryCredentialStore;
pub use password::{HashParams, PasswordError, PasswordHasher};
pub use service::{AuthError, AuthService, MIN_PASSWORD_LENGTH};
pub use store::{CredentialStore, Identity, IdentityProfile, NewIdentity, StoreError};

// Re-export useful types
pub use async_trait::async_trait;
