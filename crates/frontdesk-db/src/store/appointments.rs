use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use frontdesk_booking::{
    Appointment, AppointmentStatus, AppointmentStore, AppointmentStoreError, NewAppointment,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel, NotSet,
    QueryFilter, QueryOrder, Set,
};
use tracing::debug;

use super::is_unique_violation;
use crate::entities::appointment;

fn map_write_err(err: DbErr) -> AppointmentStoreError {
    if is_unique_violation(&err) {
        debug!("Appointment write hit the active-slot index");
        AppointmentStoreError::SlotTaken
    } else {
        AppointmentStoreError::Backend(err.to_string())
    }
}

fn backend(err: DbErr) -> AppointmentStoreError {
    AppointmentStoreError::Backend(err.to_string())
}

/// [`AppointmentStore`] over the `appointments` table
///
/// Inserts rely on the partial unique index `idx_appointments_active_slot`
/// to reject a second slot-holding booking atomically.
#[derive(Clone, Debug)]
pub struct SeaOrmAppointmentStore {
    db: DatabaseConnection,
}

impl SeaOrmAppointmentStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AppointmentStore for SeaOrmAppointmentStore {
    async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<Appointment>, AppointmentStoreError> {
        let rows = appointment::Entity::find()
            .filter(appointment::Column::Date.eq(date))
            .order_by_asc(appointment::Column::TimeSlot)
            .all(&self.db)
            .await
            .map_err(backend)?;
        Ok(rows.into_iter().map(Appointment::from).collect())
    }

    async fn insert(&self, new: NewAppointment) -> Result<Appointment, AppointmentStoreError> {
        let now = Utc::now();
        let model = appointment::ActiveModel {
            id: NotSet,
            patient_id: Set(new.patient_id),
            doctor_id: Set(new.doctor_id),
            date: Set(new.date),
            time_slot: Set(new.time_slot),
            status: Set(new.status.into()),
            notes: Set(new.notes),
            created_by: Set(new.created_by),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = model.insert(&self.db).await.map_err(map_write_err)?;
        Ok(inserted.into())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Appointment>, AppointmentStoreError> {
        let found = appointment::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(backend)?;
        Ok(found.map(Appointment::from))
    }

    async fn update_status(
        &self,
        id: i32,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentStoreError> {
        let existing = appointment::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(backend)?
            .ok_or(AppointmentStoreError::NotFound)?;

        let mut model = existing.into_active_model();
        model.status = Set(status.into());
        model.updated_at = Set(Utc::now());

        let updated = model.update(&self.db).await.map_err(map_write_err)?;
        Ok(updated.into())
    }
}
