//! Booking conflict checking and admission

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::store::{AppointmentStore, AppointmentStoreError};
use crate::types::{Appointment, AppointmentStatus, NewAppointment};

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("time slot is not available")]
    SlotUnavailable,

    #[error("appointment not found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("operation timed out")]
    Timeout,
}

impl From<AppointmentStoreError> for BookingError {
    fn from(err: AppointmentStoreError) -> Self {
        match err {
            AppointmentStoreError::SlotTaken => BookingError::SlotUnavailable,
            AppointmentStoreError::NotFound => BookingError::NotFound,
            AppointmentStoreError::Backend(msg) => BookingError::Storage(msg),
        }
    }
}

/// Decides whether a booking is admissible and records it
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn AppointmentStore>,
}

impl BookingService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    /// False iff a non-cancelled appointment already holds this doctor, date and slot
    pub async fn is_available(
        &self,
        doctor_id: i32,
        date: NaiveDate,
        time_slot: &str,
    ) -> Result<bool, BookingError> {
        let booked = self.store.find_by_date(date).await?;
        Ok(!booked.iter().any(|a| a.occupies(doctor_id, time_slot)))
    }

    /// Admit a booking
    ///
    /// The availability lookup only gives an early answer. The store's
    /// conditional insert is what actually rules out a double booking when
    /// two requests race for the same slot.
    pub async fn create_appointment(
        &self,
        appointment: NewAppointment,
        deadline: Duration,
    ) -> Result<Appointment, BookingError> {
        tokio::time::timeout(deadline, self.admit(appointment))
            .await
            .map_err(|_| BookingError::Timeout)?
    }

    async fn admit(&self, appointment: NewAppointment) -> Result<Appointment, BookingError> {
        if appointment.status.holds_slot()
            && !self
                .is_available(appointment.doctor_id, appointment.date, &appointment.time_slot)
                .await?
        {
            warn!(
                doctor_id = appointment.doctor_id,
                date = %appointment.date,
                time_slot = %appointment.time_slot,
                "Booking rejected: slot already taken"
            );
            return Err(BookingError::SlotUnavailable);
        }

        let stored = self.store.insert(appointment).await.map_err(|e| {
            if matches!(e, AppointmentStoreError::SlotTaken) {
                warn!("Booking lost race for slot");
            }
            BookingError::from(e)
        })?;

        info!(
            appointment_id = stored.id,
            doctor_id = stored.doctor_id,
            date = %stored.date,
            "Appointment booked"
        );
        Ok(stored)
    }

    pub async fn appointments_on(&self, date: NaiveDate) -> Result<Vec<Appointment>, BookingError> {
        Ok(self.store.find_by_date(date).await?)
    }

    pub async fn find(&self, id: i32) -> Result<Appointment, BookingError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(BookingError::NotFound)
    }

    /// Move an appointment to `status`
    ///
    /// Reinstating a cancelled appointment whose slot has since been taken
    /// fails with [`BookingError::SlotUnavailable`].
    pub async fn update_status(
        &self,
        id: i32,
        status: AppointmentStatus,
    ) -> Result<Appointment, BookingError> {
        let updated = self.store.update_status(id, status).await?;
        debug!(appointment_id = id, status = %status, "Appointment status updated");
        Ok(updated)
    }
}

impl std::fmt::Debug for BookingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryAppointmentStore;

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            BookingError::from(AppointmentStoreError::SlotTaken),
            BookingError::SlotUnavailable
        ));
        assert!(matches!(
            BookingError::from(AppointmentStoreError::Backend("disk".into())),
            BookingError::Storage(_)
        ));
    }

    #[tokio::test]
    async fn test_booking_a_cancelled_appointment_ignores_slot() {
        let booking = BookingService::new(Arc::new(MemoryAppointmentStore::new()));
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let new = |status| NewAppointment {
            patient_id: 1,
            doctor_id: 7,
            date,
            time_slot: "09:00".to_string(),
            status,
            notes: None,
            created_by: 1,
        };

        booking
            .create_appointment(new(AppointmentStatus::Scheduled), Duration::from_secs(5))
            .await
            .unwrap();
        // a cancelled record does not compete for the slot
        booking
            .create_appointment(new(AppointmentStatus::Cancelled), Duration::from_secs(5))
            .await
            .unwrap();
    }
}
