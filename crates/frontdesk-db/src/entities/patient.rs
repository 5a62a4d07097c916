//! Patient record entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "patients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub first_name: String,

    pub last_name: String,

    /// Contact email (unique when present)
    #[sea_orm(unique)]
    pub email: Option<String>,

    pub phone: String,

    pub date_of_birth: ChronoDate,

    pub gender: String,

    pub address: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub medical_history: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub current_medication: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub allergies: Option<String>,

    pub emergency_contact: Option<String>,

    pub blood_group: Option<String>,

    pub insurance_number: Option<String>,

    /// User who created the record
    pub registered_by: i32,

    /// User who last changed the record
    pub last_updated_by: i32,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::appointment::Entity")]
    Appointments,
}

impl Related<super::appointment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Appointments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
