//! Integration tests for frontdesk-db
//!
//! Tests database operations with real SQLite in-memory database

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use frontdesk_auth::{CredentialStore, NewIdentity, Role, StoreError};
use frontdesk_booking::{
    AppointmentStatus, AppointmentStore, AppointmentStoreError, BookingError, BookingService,
    NewAppointment,
};
use frontdesk_db::{
    connect,
    entities::{appointment, patient, user},
    migrate, SeaOrmAppointmentStore, SeaOrmCredentialStore,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set,
};

/// Helper to create a test database
async fn setup_test_db() -> DatabaseConnection {
    let db = connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    migrate(&db).await.expect("Failed to run migrations");

    db
}

fn new_identity(email: &str, role: Role) -> NewIdentity {
    NewIdentity {
        email: email.to_string(),
        password_hash: "$argon2id$v=19$m=8,t=1,p=1$c2FsdHNhbHQ$aGFzaGhhc2g".to_string(),
        name: "Staff Member".to_string(),
        role,
        is_active: true,
    }
}

async fn seed_patient(db: &DatabaseConnection, registered_by: i32) -> patient::Model {
    patient::ActiveModel {
        first_name: Set("Ada".to_string()),
        last_name: Set("Lovelace".to_string()),
        email: Set(Some("ada@example.com".to_string())),
        phone: Set("555-0100".to_string()),
        date_of_birth: Set(NaiveDate::from_ymd_opt(1985, 12, 10).unwrap()),
        gender: Set("female".to_string()),
        address: Set(None),
        medical_history: Set(None),
        current_medication: Set(None),
        allergies: Set(Some("penicillin".to_string())),
        emergency_contact: Set(None),
        blood_group: Set(Some("O+".to_string())),
        insurance_number: Set(None),
        registered_by: Set(registered_by),
        last_updated_by: Set(registered_by),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert patient")
}

/// Desk user, clinician and one patient
async fn seed(db: &DatabaseConnection) -> (i32, i32, i32) {
    let credentials = SeaOrmCredentialStore::new(db.clone());
    let desk = credentials
        .insert(new_identity("desk@clinic.test", Role::FrontDesk))
        .await
        .unwrap();
    let doctor = credentials
        .insert(new_identity("doc@clinic.test", Role::Clinician))
        .await
        .unwrap();
    let patient = seed_patient(db, desk.id).await;
    (desk.id, doctor.id, patient.id)
}

fn booking(patient_id: i32, doctor_id: i32, created_by: i32, slot: &str) -> NewAppointment {
    NewAppointment {
        patient_id,
        doctor_id,
        date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        time_slot: slot.to_string(),
        status: AppointmentStatus::Scheduled,
        notes: None,
        created_by,
    }
}

#[tokio::test]
async fn test_database_connection() {
    let db = connect("sqlite::memory:").await.expect("Failed to connect");

    let backend = db.get_database_backend();
    assert!(matches!(backend, sea_orm::DatabaseBackend::Sqlite));
}

#[tokio::test]
async fn test_migrations_run_successfully() {
    let db = connect("sqlite::memory:").await.expect("Failed to connect");

    let result = migrate(&db).await;
    assert!(result.is_ok());

    // running again is a no-op
    assert!(migrate(&db).await.is_ok());
}

#[tokio::test]
async fn test_credential_store_roundtrip() {
    let db = setup_test_db().await;
    let store = SeaOrmCredentialStore::new(db.clone());

    let inserted = store
        .insert(new_identity("desk@clinic.test", Role::FrontDesk))
        .await
        .unwrap();
    assert!(inserted.id > 0);

    let by_handle = store
        .find_by_handle("desk@clinic.test")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_handle.id, inserted.id);
    assert_eq!(by_handle.role, Role::FrontDesk);

    // stored as the wire constant
    let row = user::Entity::find_by_id(inserted.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.role, user::UserRole::FrontDesk);

    assert!(store.find_by_id(inserted.id + 1).await.unwrap().is_none());
    assert!(store
        .find_by_handle("DESK@clinic.test")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_credential_store_rejects_duplicate_handle() {
    let db = setup_test_db().await;
    let store = SeaOrmCredentialStore::new(db);

    let mut first = store
        .insert(new_identity("dup@clinic.test", Role::Clinician))
        .await
        .unwrap();
    first.is_active = false;
    store.save(&first).await.unwrap();

    let again = store
        .insert(new_identity("dup@clinic.test", Role::FrontDesk))
        .await;
    assert!(matches!(again, Err(StoreError::Duplicate)));
}

#[tokio::test]
async fn test_credential_store_save_updates_hash() {
    let db = setup_test_db().await;
    let store = SeaOrmCredentialStore::new(db);

    let mut identity = store
        .insert(new_identity("doc@clinic.test", Role::Clinician))
        .await
        .unwrap();
    identity.password_hash = "$argon2id$v=19$m=8,t=1,p=1$bmV3c2FsdA$bmV3aGFzaA".to_string();
    store.save(&identity).await.unwrap();

    let reloaded = store.find_by_id(identity.id).await.unwrap().unwrap();
    assert_eq!(reloaded.password_hash, identity.password_hash);
    assert!(reloaded.updated_at >= identity.updated_at);
}

#[tokio::test]
async fn test_appointment_store_rejects_active_duplicate() {
    let db = setup_test_db().await;
    let (desk, doctor, patient) = seed(&db).await;
    let store = SeaOrmAppointmentStore::new(db.clone());

    let first = store
        .insert(booking(patient, doctor, desk, "09:00"))
        .await
        .unwrap();
    assert_eq!(first.status, AppointmentStatus::Scheduled);

    let second = store.insert(booking(patient, doctor, desk, "09:00")).await;
    assert!(matches!(second, Err(AppointmentStoreError::SlotTaken)));

    let count = appointment::Entity::find().count(&db).await.unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_cancelled_appointment_frees_slot_in_index() {
    let db = setup_test_db().await;
    let (desk, doctor, patient) = seed(&db).await;
    let store = SeaOrmAppointmentStore::new(db.clone());

    let first = store
        .insert(booking(patient, doctor, desk, "09:00"))
        .await
        .unwrap();
    store
        .update_status(first.id, AppointmentStatus::Cancelled)
        .await
        .unwrap();

    let rebooked = store
        .insert(booking(patient, doctor, desk, "09:00"))
        .await
        .unwrap();
    assert_ne!(rebooked.id, first.id);

    // the cancelled one cannot come back into the taken slot
    let reinstate = store
        .update_status(first.id, AppointmentStatus::Scheduled)
        .await;
    assert!(matches!(reinstate, Err(AppointmentStoreError::SlotTaken)));

    let on_day = store
        .find_by_date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        .await
        .unwrap();
    assert_eq!(on_day.len(), 2);
}

#[tokio::test]
async fn test_update_status_missing_appointment() {
    let db = setup_test_db().await;
    let store = SeaOrmAppointmentStore::new(db);

    let result = store
        .update_status(12345, AppointmentStatus::Completed)
        .await;
    assert!(matches!(result, Err(AppointmentStoreError::NotFound)));
}

#[tokio::test]
async fn test_booking_service_availability_over_sqlite() {
    let db = setup_test_db().await;
    let (desk, doctor, patient) = seed(&db).await;
    let service = BookingService::new(Arc::new(SeaOrmAppointmentStore::new(db)));
    let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

    service
        .create_appointment(booking(patient, doctor, desk, "09:00"), Duration::from_secs(5))
        .await
        .unwrap();

    assert!(!service.is_available(doctor, date, "09:00").await.unwrap());
    assert!(service.is_available(doctor, date, "09:30").await.unwrap());
    assert!(service.is_available(doctor + 100, date, "09:00").await.unwrap());
    assert!(service
        .is_available(doctor, date.succ_opt().unwrap(), "09:00")
        .await
        .unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookings_exactly_one_succeeds() {
    let db = setup_test_db().await;
    let (desk, doctor, patient) = seed(&db).await;
    let service = BookingService::new(Arc::new(SeaOrmAppointmentStore::new(db.clone())));

    let attempts = (0..2).map(|_| {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .create_appointment(
                    booking(patient, doctor, desk, "11:00"),
                    Duration::from_secs(10),
                )
                .await
        })
    });
    let results: Vec<_> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(BookingError::SlotUnavailable))));

    let active = appointment::Entity::find()
        .filter(appointment::Column::TimeSlot.eq("11:00"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(active, 1);
}

#[tokio::test]
async fn test_deleting_patient_cascades_appointments() {
    let db = setup_test_db().await;
    let (desk, doctor, patient_id) = seed(&db).await;
    let store = SeaOrmAppointmentStore::new(db.clone());
    store
        .insert(booking(patient_id, doctor, desk, "09:00"))
        .await
        .unwrap();

    patient::Entity::delete_by_id(patient_id)
        .exec(&db)
        .await
        .unwrap();

    let remaining = appointment::Entity::find().count(&db).await.unwrap();
    assert_eq!(remaining, 0);
}
