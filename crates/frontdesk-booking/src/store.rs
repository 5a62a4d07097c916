//! Appointment store abstraction

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::types::{Appointment, AppointmentStatus, NewAppointment};

#[derive(Debug, Error)]
pub enum AppointmentStoreError {
    /// A non-cancelled appointment already holds this doctor, date and slot
    #[error("time slot already booked")]
    SlotTaken,

    #[error("appointment not found")]
    NotFound,

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Persistence for appointments
///
/// `insert` (and `update_status` when it moves an appointment back into a
/// slot-holding state) must be atomic with respect to the slot rule: two
/// concurrent writers for the same doctor, date and slot can never both
/// succeed. The loser gets [`AppointmentStoreError::SlotTaken`].
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// All appointments on `date`, any doctor, any status
    async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<Appointment>, AppointmentStoreError>;

    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, AppointmentStoreError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Appointment>, AppointmentStoreError>;

    async fn update_status(
        &self,
        id: i32,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentStoreError>;
}
