//! Booking conflict rules over the in-memory store

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use frontdesk_booking::{
    Appointment, AppointmentStatus, AppointmentStore, AppointmentStoreError, BookingError,
    BookingService, MemoryAppointmentStore, NewAppointment,
};

const DEADLINE: Duration = Duration::from_secs(5);

fn march_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn request(doctor_id: i32, date: NaiveDate, slot: &str) -> NewAppointment {
    NewAppointment {
        patient_id: 11,
        doctor_id,
        date,
        time_slot: slot.to_string(),
        status: AppointmentStatus::Scheduled,
        notes: Some("follow-up".to_string()),
        created_by: 1,
    }
}

fn setup() -> (BookingService, Arc<MemoryAppointmentStore>) {
    let store = Arc::new(MemoryAppointmentStore::new());
    (BookingService::new(store.clone()), store)
}

#[tokio::test]
async fn test_availability_table() {
    let (booking, _) = setup();
    booking
        .create_appointment(request(7, march_first(), "09:00"), DEADLINE)
        .await
        .unwrap();

    let next_day = march_first().succ_opt().unwrap();
    let cases = [
        (7, march_first(), "09:00", false),
        (7, march_first(), "09:30", true),
        (8, march_first(), "09:00", true),
        (7, next_day, "09:00", true),
        // labels are opaque; no normalisation
        (7, march_first(), "9:00", true),
    ];

    for (doctor, date, slot, expected) in cases {
        assert_eq!(
            booking.is_available(doctor, date, slot).await.unwrap(),
            expected,
            "doctor {doctor} on {date} at {slot}"
        );
    }
}

#[tokio::test]
async fn test_cancellation_frees_slot() {
    let (booking, _) = setup();
    let first = booking
        .create_appointment(request(7, march_first(), "09:00"), DEADLINE)
        .await
        .unwrap();

    booking
        .update_status(first.id, AppointmentStatus::Cancelled)
        .await
        .unwrap();
    assert!(booking
        .is_available(7, march_first(), "09:00")
        .await
        .unwrap());

    let rebooked = booking
        .create_appointment(request(7, march_first(), "09:00"), DEADLINE)
        .await
        .unwrap();
    assert_ne!(rebooked.id, first.id);
}

#[tokio::test]
async fn test_completed_appointment_still_holds_slot() {
    let (booking, _) = setup();
    let first = booking
        .create_appointment(request(7, march_first(), "09:00"), DEADLINE)
        .await
        .unwrap();
    booking
        .update_status(first.id, AppointmentStatus::Completed)
        .await
        .unwrap();

    let again = booking
        .create_appointment(request(7, march_first(), "09:00"), DEADLINE)
        .await;
    assert!(matches!(again, Err(BookingError::SlotUnavailable)));
}

#[tokio::test]
async fn test_double_booking_rejected() {
    let (booking, store) = setup();
    booking
        .create_appointment(request(7, march_first(), "09:00"), DEADLINE)
        .await
        .unwrap();

    let second = booking
        .create_appointment(request(7, march_first(), "09:00"), DEADLINE)
        .await;
    assert!(matches!(second, Err(BookingError::SlotUnavailable)));
    assert_eq!(store.find_by_date(march_first()).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookings_exactly_one_succeeds() {
    let (booking, store) = setup();

    let attempts = (0..8).map(|_| {
        let booking = booking.clone();
        tokio::spawn(async move {
            booking
                .create_appointment(request(7, march_first(), "10:00"), DEADLINE)
                .await
        })
    });
    let results: Vec<_> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(BookingError::SlotUnavailable))));

    let stored = store.find_by_date(march_first()).await.unwrap();
    assert_eq!(stored.len(), 1);
}

/// Store that reports the slot free on lookup but loses the insert race
struct RacingStore;

#[frontdesk_booking::async_trait]
impl AppointmentStore for RacingStore {
    async fn find_by_date(&self, _date: NaiveDate) -> Result<Vec<Appointment>, AppointmentStoreError> {
        Ok(Vec::new())
    }

    async fn insert(&self, _appointment: NewAppointment) -> Result<Appointment, AppointmentStoreError> {
        Err(AppointmentStoreError::SlotTaken)
    }

    async fn find_by_id(&self, _id: i32) -> Result<Option<Appointment>, AppointmentStoreError> {
        Ok(None)
    }

    async fn update_status(
        &self,
        _id: i32,
        _status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentStoreError> {
        Err(AppointmentStoreError::NotFound)
    }
}

#[tokio::test]
async fn test_conflict_at_insert_is_slot_unavailable() {
    let booking = BookingService::new(Arc::new(RacingStore));

    let result = booking
        .create_appointment(request(7, march_first(), "09:00"), DEADLINE)
        .await;
    assert!(matches!(result, Err(BookingError::SlotUnavailable)));
    assert!(matches!(booking.find(1).await, Err(BookingError::NotFound)));
}

/// Store whose calls never return
struct StalledStore;

#[frontdesk_booking::async_trait]
impl AppointmentStore for StalledStore {
    async fn find_by_date(&self, _date: NaiveDate) -> Result<Vec<Appointment>, AppointmentStoreError> {
        std::future::pending().await
    }

    async fn insert(&self, _appointment: NewAppointment) -> Result<Appointment, AppointmentStoreError> {
        std::future::pending().await
    }

    async fn find_by_id(&self, _id: i32) -> Result<Option<Appointment>, AppointmentStoreError> {
        std::future::pending().await
    }

    async fn update_status(
        &self,
        _id: i32,
        _status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentStoreError> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_create_appointment_times_out() {
    let booking = BookingService::new(Arc::new(StalledStore));

    let result = booking
        .create_appointment(request(7, march_first(), "09:00"), Duration::from_secs(2))
        .await;
    assert!(matches!(result, Err(BookingError::Timeout)));
}
