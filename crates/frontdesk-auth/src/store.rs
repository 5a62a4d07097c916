//! Credential store abstraction

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::authz::Role;

/// Errors surfaced by a credential store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// Insert rejected because the handle is already taken
    #[error("handle already exists")]
    Duplicate,

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A stored identity, including its password hash
#[derive(Clone, PartialEq)]
pub struct Identity {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// The identity as it may leave the service
    pub fn profile(&self) -> IdentityProfile {
        IdentityProfile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .finish()
    }
}

/// Identity without the password hash
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityProfile {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to persist a new identity
#[derive(Clone)]
pub struct NewIdentity {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
}

impl std::fmt::Debug for NewIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewIdentity")
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("name", &self.name)
            .field("role", &self.role)
            .finish()
    }
}

/// Persistence for identities
///
/// Handle lookups are exact-match. Implementations must reject a second
/// identity with an existing handle (active or not) with [`StoreError::Duplicate`].
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_handle(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Identity>, StoreError>;

    /// Persist a new identity and return it with its assigned id
    async fn insert(&self, identity: NewIdentity) -> Result<Identity, StoreError>;

    /// Overwrite an existing identity
    async fn save(&self, identity: &Identity) -> Result<(), StoreError>;
}
