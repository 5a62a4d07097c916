//! In-memory appointment store

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::store::{AppointmentStore, AppointmentStoreError};
use crate::types::{Appointment, AppointmentStatus, NewAppointment};

#[derive(Default)]
struct Inner {
    appointments: Vec<Appointment>,
    next_id: i32,
}

impl Inner {
    fn slot_taken(&self, doctor_id: i32, date: NaiveDate, time_slot: &str, except: Option<i32>) -> bool {
        self.appointments
            .iter()
            .filter(|a| Some(a.id) != except)
            .any(|a| a.date == date && a.occupies(doctor_id, time_slot))
    }
}

/// Process-local [`AppointmentStore`]
///
/// The slot check and the write happen under the same lock.
#[derive(Default)]
pub struct MemoryAppointmentStore {
    inner: Mutex<Inner>,
}

impl MemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, AppointmentStoreError> {
        self.inner
            .lock()
            .map_err(|_| AppointmentStoreError::Backend("appointment store lock poisoned".to_string()))
    }
}

#[async_trait]
impl AppointmentStore for MemoryAppointmentStore {
    async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<Appointment>, AppointmentStoreError> {
        let inner = self.lock()?;
        Ok(inner
            .appointments
            .iter()
            .filter(|a| a.date == date)
            .cloned()
            .collect())
    }

    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, AppointmentStoreError> {
        let mut inner = self.lock()?;
        if appointment.status.holds_slot()
            && inner.slot_taken(appointment.doctor_id, appointment.date, &appointment.time_slot, None)
        {
            return Err(AppointmentStoreError::SlotTaken);
        }

        inner.next_id += 1;
        let now = Utc::now();
        let stored = Appointment {
            id: inner.next_id,
            patient_id: appointment.patient_id,
            doctor_id: appointment.doctor_id,
            date: appointment.date,
            time_slot: appointment.time_slot,
            status: appointment.status,
            notes: appointment.notes,
            created_by: appointment.created_by,
            created_at: now,
            updated_at: now,
        };
        inner.appointments.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Appointment>, AppointmentStoreError> {
        let inner = self.lock()?;
        Ok(inner.appointments.iter().find(|a| a.id == id).cloned())
    }

    async fn update_status(
        &self,
        id: i32,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentStoreError> {
        let mut inner = self.lock()?;
        let current = inner
            .appointments
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(AppointmentStoreError::NotFound)?;

        if status.holds_slot()
            && inner.slot_taken(current.doctor_id, current.date, &current.time_slot, Some(id))
        {
            return Err(AppointmentStoreError::SlotTaken);
        }

        let appointment = inner
            .appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(AppointmentStoreError::NotFound)?;
        appointment.status = status;
        appointment.updated_at = Utc::now();
        Ok(appointment.clone())
    }
}
