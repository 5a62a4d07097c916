//! In-memory credential store

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::store::{CredentialStore, Identity, NewIdentity, StoreError};

#[derive(Default)]
struct Inner {
    identities: Vec<Identity>,
    next_id: i32,
}

/// Process-local [`CredentialStore`], used by tests and tooling
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Inner>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("credential store lock poisoned".to_string()))
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_handle(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.identities.iter().find(|i| i.email == email).cloned())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Identity>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.identities.iter().find(|i| i.id == id).cloned())
    }

    async fn insert(&self, identity: NewIdentity) -> Result<Identity, StoreError> {
        let mut inner = self.lock()?;
        if inner.identities.iter().any(|i| i.email == identity.email) {
            return Err(StoreError::Duplicate);
        }

        inner.next_id += 1;
        let now = Utc::now();
        let stored = Identity {
            id: inner.next_id,
            email: identity.email,
            password_hash: identity.password_hash,
            name: identity.name,
            role: identity.role,
            is_active: identity.is_active,
            created_at: now,
            updated_at: now,
        };
        inner.identities.push(stored.clone());
        Ok(stored)
    }

    async fn save(&self, identity: &Identity) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if inner
            .identities
            .iter()
            .any(|i| i.id != identity.id && i.email == identity.email)
        {
            return Err(StoreError::Duplicate);
        }

        let slot = inner
            .identities
            .iter_mut()
            .find(|i| i.id == identity.id)
            .ok_or_else(|| StoreError::Backend(format!("identity {} not found", identity.id)))?;
        *slot = identity.clone();
        slot.updated_at = Utc::now();
        Ok(())
    }
}
