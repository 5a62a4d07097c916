//! Appointment entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stored appointment status
///
/// The partial unique index on `(doctor_id, date, time_slot)` matches on the
/// `cancelled` string value; keep the two in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[sea_orm(string_value = "scheduled")]
    Scheduled,

    #[sea_orm(string_value = "completed")]
    Completed,

    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl From<frontdesk_booking::AppointmentStatus> for AppointmentStatus {
    fn from(status: frontdesk_booking::AppointmentStatus) -> Self {
        match status {
            frontdesk_booking::AppointmentStatus::Scheduled => AppointmentStatus::Scheduled,
            frontdesk_booking::AppointmentStatus::Completed => AppointmentStatus::Completed,
            frontdesk_booking::AppointmentStatus::Cancelled => AppointmentStatus::Cancelled,
        }
    }
}

impl From<AppointmentStatus> for frontdesk_booking::AppointmentStatus {
    fn from(status: AppointmentStatus) -> Self {
        match status {
            AppointmentStatus::Scheduled => frontdesk_booking::AppointmentStatus::Scheduled,
            AppointmentStatus::Completed => frontdesk_booking::AppointmentStatus::Completed,
            AppointmentStatus::Cancelled => frontdesk_booking::AppointmentStatus::Cancelled,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "appointments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub patient_id: i32,

    /// Treating clinician (a user id)
    pub doctor_id: i32,

    pub date: ChronoDate,

    /// Opaque slot label, compared by exact match
    pub time_slot: String,

    pub status: AppointmentStatus,

    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    /// User who booked the appointment
    pub created_by: i32,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

impl From<Model> for frontdesk_booking::Appointment {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            patient_id: model.patient_id,
            doctor_id: model.doctor_id,
            date: model.date,
            time_slot: model.time_slot,
            status: model.status.into(),
            notes: model.notes,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::patient::Entity",
        from = "Column::PatientId",
        to = "super::patient::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Patient,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::DoctorId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    Doctor,
}

impl Related<super::patient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Patient.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Doctor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
