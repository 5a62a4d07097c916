//! SeaORM implementations of the credential and appointment stores

mod appointments;
mod credentials;

pub use appointments::SeaOrmAppointmentStore;
pub use credentials::SeaOrmCredentialStore;

use sea_orm::{DbErr, SqlErr};

/// True if the database rejected a write on a unique constraint
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
