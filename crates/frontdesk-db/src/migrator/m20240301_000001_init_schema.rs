//! Initial schema: users, patients, appointments

use sea_orm_migration::{prelude::*, schema::*};

/// At most one slot-holding appointment per doctor, date and slot label
const CREATE_ACTIVE_SLOT_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS idx_appointments_active_slot \
     ON appointments (doctor_id, date, time_slot) WHERE status <> 'cancelled'";

const DROP_ACTIVE_SLOT_INDEX: &str = "DROP INDEX IF EXISTS idx_appointments_active_slot";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================================
        // 1. Create users table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(pk_auto(User::Id))
                    .col(string_len(User::Email, 255).not_null().unique_key())
                    .col(string_len(User::PasswordHash, 255).not_null())
                    .col(string_len(User::Name, 255).not_null())
                    .col(string_len(User::Role, 32).not_null())
                    .col(boolean(User::IsActive).not_null().default(true))
                    .col(
                        timestamp_with_time_zone(User::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(User::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 2. Create patients table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Patient::Table)
                    .if_not_exists()
                    .col(pk_auto(Patient::Id))
                    .col(string_len(Patient::FirstName, 100).not_null())
                    .col(string_len(Patient::LastName, 100).not_null())
                    .col(string_len_null(Patient::Email, 255).unique_key())
                    .col(string_len(Patient::Phone, 32).not_null())
                    .col(date(Patient::DateOfBirth).not_null())
                    .col(string_len(Patient::Gender, 20).not_null())
                    .col(string_len_null(Patient::Address, 255))
                    .col(text_null(Patient::MedicalHistory))
                    .col(text_null(Patient::CurrentMedication))
                    .col(text_null(Patient::Allergies))
                    .col(string_len_null(Patient::EmergencyContact, 255))
                    .col(string_len_null(Patient::BloodGroup, 10))
                    .col(string_len_null(Patient::InsuranceNumber, 50))
                    .col(integer(Patient::RegisteredBy).not_null())
                    .col(integer(Patient::LastUpdatedBy).not_null())
                    .col(
                        timestamp_with_time_zone(Patient::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Patient::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_patients_last_name")
                    .table(Patient::Table)
                    .col(Patient::LastName)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 3. Create appointments table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Appointment::Table)
                    .if_not_exists()
                    .col(pk_auto(Appointment::Id))
                    .col(integer(Appointment::PatientId).not_null())
                    .col(integer(Appointment::DoctorId).not_null())
                    .col(date(Appointment::Date).not_null())
                    .col(string_len(Appointment::TimeSlot, 32).not_null())
                    .col(
                        string_len(Appointment::Status, 20)
                            .not_null()
                            .default("scheduled"),
                    )
                    .col(text_null(Appointment::Notes))
                    .col(integer(Appointment::CreatedBy).not_null())
                    .col(
                        timestamp_with_time_zone(Appointment::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Appointment::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_appointments_patient_id")
                            .from(Appointment::Table, Appointment::PatientId)
                            .to(Patient::Table, Patient::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_appointments_doctor_id")
                            .from(Appointment::Table, Appointment::DoctorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_appointments_date", Appointment::Date),
            ("idx_appointments_doctor_id", Appointment::DoctorId),
            ("idx_appointments_patient_id", Appointment::PatientId),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(Appointment::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        // Partial index; not expressible through the index builder
        manager
            .get_connection()
            .execute_unprepared(CREATE_ACTIVE_SLOT_INDEX)
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DROP_ACTIVE_SLOT_INDEX)
            .await?;

        manager
            .drop_table(Table::drop().table(Appointment::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Patient::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum User {
    #[sea_orm(iden = "users")]
    Table,
    Id,
    Email,
    PasswordHash,
    Name,
    Role,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Patient {
    #[sea_orm(iden = "patients")]
    Table,
    Id,
    FirstName,
    LastName,
    Email,
    Phone,
    DateOfBirth,
    Gender,
    Address,
    MedicalHistory,
    CurrentMedication,
    Allergies,
    EmergencyContact,
    BloodGroup,
    InsuranceNumber,
    RegisteredBy,
    LastUpdatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Appointment {
    #[sea_orm(iden = "appointments")]
    Table,
    Id,
    PatientId,
    DoctorId,
    Date,
    TimeSlot,
    Status,
    Notes,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}
