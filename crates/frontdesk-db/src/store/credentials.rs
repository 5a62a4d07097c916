use async_trait::async_trait;
use chrono::Utc;
use frontdesk_auth::{CredentialStore, Identity, NewIdentity, Role, StoreError};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, NotSet, QueryFilter, Set,
};

use super::is_unique_violation;
use crate::entities::user::{self, UserRole};

impl From<Role> for UserRole {
    fn from(role: Role) -> Self {
        match role {
            Role::FrontDesk => UserRole::FrontDesk,
            Role::Clinician => UserRole::Clinician,
        }
    }
}

impl From<UserRole> for Role {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::FrontDesk => Role::FrontDesk,
            UserRole::Clinician => Role::Clinician,
        }
    }
}

impl From<user::Model> for Identity {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            password_hash: model.password_hash,
            name: model.name,
            role: model.role.into(),
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

fn backend(err: DbErr) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// [`CredentialStore`] over the `users` table
#[derive(Clone, Debug)]
pub struct SeaOrmCredentialStore {
    db: DatabaseConnection,
}

impl SeaOrmCredentialStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for SeaOrmCredentialStore {
    async fn find_by_handle(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let found = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(backend)?;
        Ok(found.map(Identity::from))
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Identity>, StoreError> {
        let found = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(backend)?;
        Ok(found.map(Identity::from))
    }

    async fn insert(&self, identity: NewIdentity) -> Result<Identity, StoreError> {
        let now = Utc::now();
        let model = user::ActiveModel {
            id: NotSet,
            email: Set(identity.email),
            password_hash: Set(identity.password_hash),
            name: Set(identity.name),
            role: Set(identity.role.into()),
            is_active: Set(identity.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = model.insert(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate
            } else {
                backend(e)
            }
        })?;
        Ok(inserted.into())
    }

    async fn save(&self, identity: &Identity) -> Result<(), StoreError> {
        let model = user::ActiveModel {
            id: Set(identity.id),
            email: Set(identity.email.clone()),
            password_hash: Set(identity.password_hash.clone()),
            name: Set(identity.name.clone()),
            role: Set(identity.role.into()),
            is_active: Set(identity.is_active),
            created_at: Set(identity.created_at),
            updated_at: Set(Utc::now()),
        };

        model.update(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate
            } else {
                backend(e)
            }
        })?;
        Ok(())
    }
}
