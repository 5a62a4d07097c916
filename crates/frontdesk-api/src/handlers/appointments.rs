//! Appointment booking handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::info;

use frontdesk_booking::NewAppointment;
use frontdesk_db::entities::{appointment, patient, user};

use crate::error::{booking_error, bad_request, db_error, not_found, ApiError};
use crate::middleware::AuthUser;
use crate::models::*;
use crate::AppState;

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| bad_request("Invalid date format, expected YYYY-MM-DD", "INVALID_DATE"))
}

fn to_api(models: Vec<appointment::Model>) -> Vec<Appointment> {
    models
        .into_iter()
        .map(|m| frontdesk_booking::Appointment::from(m).into())
        .collect()
}

/// List appointments, most recent date first
#[utoipa::path(
    get,
    path = "/api/appointments",
    params(
        ("page" = Option<u64>, Query, description = "Page number, 1-based (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Page size (default: 10, max: 100)")
    ),
    responses(
        (status = 200, description = "Page of appointments", body = AppointmentList)
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<AppointmentList>, ApiError> {
    let (page, limit) = query.resolve();

    let paginator = appointment::Entity::find()
        .order_by_desc(appointment::Column::Date)
        .order_by_desc(appointment::Column::TimeSlot)
        .paginate(&state.db, limit);

    let total = paginator.num_items().await.map_err(db_error)?;
    let appointments = paginator.fetch_page(page - 1).await.map_err(db_error)?;

    Ok(Json(AppointmentList {
        appointments: to_api(appointments),
        total,
        page,
        limit,
    }))
}

/// Appointments on one day
#[utoipa::path(
    get,
    path = "/api/appointments/date",
    params(
        ("date" = String, Query, description = "Day to list (YYYY-MM-DD)")
    ),
    responses(
        (status = 200, description = "Appointments on the day, by slot", body = [Appointment]),
        (status = 400, description = "Missing or malformed date", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn appointments_by_date(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let raw = query
        .date
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| bad_request("Date parameter required", "MISSING_DATE"))?;
    let date = parse_date(raw)?;

    let appointments = state
        .booking
        .appointments_on(date)
        .await
        .map_err(booking_error)?;

    Ok(Json(appointments.into_iter().map(Appointment::from).collect()))
}

/// Check whether a doctor's slot is free
#[utoipa::path(
    get,
    path = "/api/appointments/availability",
    params(
        ("doctor_id" = i32, Query, description = "Clinician user ID"),
        ("date" = String, Query, description = "Day (YYYY-MM-DD)"),
        ("time_slot" = String, Query, description = "Slot label")
    ),
    responses(
        (status = 200, description = "Availability", body = AvailabilityResponse),
        (status = 400, description = "Malformed date", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn check_availability(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let date = parse_date(&query.date)?;

    let available = state
        .booking
        .is_available(query.doctor_id, date, &query.time_slot)
        .await
        .map_err(booking_error)?;

    Ok(Json(AvailabilityResponse {
        doctor_id: query.doctor_id,
        date,
        time_slot: query.time_slot,
        available,
    }))
}

/// Get an appointment
#[utoipa::path(
    get,
    path = "/api/appointments/{id}",
    params(
        ("id" = i32, Path, description = "Appointment ID")
    ),
    responses(
        (status = 200, description = "Appointment", body = Appointment),
        (status = 404, description = "Appointment not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<Appointment>, ApiError> {
    let found = state.booking.find(id).await.map_err(booking_error)?;
    Ok(Json(found.into()))
}

/// All appointments of one patient
#[utoipa::path(
    get,
    path = "/api/appointments/patient/{id}",
    params(
        ("id" = i32, Path, description = "Patient ID")
    ),
    responses(
        (status = 200, description = "Patient's appointments", body = [Appointment])
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn appointments_by_patient(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<i32>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let appointments = appointment::Entity::find()
        .filter(appointment::Column::PatientId.eq(patient_id))
        .order_by_desc(appointment::Column::Date)
        .order_by_desc(appointment::Column::TimeSlot)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    Ok(Json(to_api(appointments)))
}

/// All appointments of one clinician
#[utoipa::path(
    get,
    path = "/api/appointments/doctor/{id}",
    params(
        ("id" = i32, Path, description = "Clinician user ID")
    ),
    responses(
        (status = 200, description = "Clinician's appointments", body = [Appointment])
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn appointments_by_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<i32>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let appointments = appointment::Entity::find()
        .filter(appointment::Column::DoctorId.eq(doctor_id))
        .order_by_desc(appointment::Column::Date)
        .order_by_desc(appointment::Column::TimeSlot)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    Ok(Json(to_api(appointments)))
}

/// Book an appointment (front desk only)
#[utoipa::path(
    post,
    path = "/api/appointments",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment booked", body = Appointment),
        (status = 400, description = "Invalid input or doctor", body = ErrorResponse),
        (status = 403, description = "Role not permitted", body = ErrorResponse),
        (status = 404, description = "Patient not found", body = ErrorResponse),
        (status = 409, description = "Slot already taken", body = ErrorResponse),
        (status = 503, description = "Booking timed out", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(req): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let date = parse_date(&req.date)?;
    let time_slot = req.time_slot.trim();
    if time_slot.is_empty() {
        return Err(bad_request("Time slot is required", "VALIDATION_ERROR"));
    }

    patient::Entity::find_by_id(req.patient_id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Patient not found", "PATIENT_NOT_FOUND"))?;

    let doctor = user::Entity::find_by_id(req.doctor_id)
        .one(&state.db)
        .await
        .map_err(db_error)?;
    let is_bookable = doctor
        .as_ref()
        .is_some_and(|d| d.is_active && d.role == user::UserRole::Clinician);
    if !is_bookable {
        return Err(bad_request(
            "Doctor must be an active clinician",
            "INVALID_DOCTOR",
        ));
    }

    let booked = state
        .booking
        .create_appointment(
            NewAppointment {
                patient_id: req.patient_id,
                doctor_id: req.doctor_id,
                date,
                time_slot: time_slot.to_string(),
                status: Default::default(),
                notes: req.notes.filter(|n| !n.trim().is_empty()),
                created_by: caller.user_id,
            },
            state.request_timeout,
        )
        .await
        .map_err(booking_error)?;

    Ok((StatusCode::CREATED, Json(booked.into())))
}

/// Change an appointment's status
#[utoipa::path(
    patch,
    path = "/api/appointments/{id}/status",
    params(
        ("id" = i32, Path, description = "Appointment ID")
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = Appointment),
        (status = 400, description = "Unknown status", body = ErrorResponse),
        (status = 404, description = "Appointment not found", body = ErrorResponse),
        (status = 409, description = "Slot taken while cancelled", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn update_appointment_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Appointment>, ApiError> {
    let status: frontdesk_booking::AppointmentStatus = req.status.parse().map_err(|_| {
        bad_request(
            "Status must be one of: scheduled, completed, cancelled",
            "INVALID_STATUS",
        )
    })?;

    let updated = state
        .booking
        .update_status(id, status)
        .await
        .map_err(booking_error)?;

    info!(appointment_id = id, user_id = user.user_id, status = %status, "Appointment status changed");
    Ok(Json(updated.into()))
}

/// Delete an appointment (front desk only)
#[utoipa::path(
    delete,
    path = "/api/appointments/{id}",
    params(
        ("id" = i32, Path, description = "Appointment ID")
    ),
    responses(
        (status = 200, description = "Appointment deleted", body = MessageResponse),
        (status = 403, description = "Role not permitted", body = ErrorResponse),
        (status = 404, description = "Appointment not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = appointment::Entity::delete_by_id(id)
        .exec(&state.db)
        .await
        .map_err(db_error)?;

    if result.rows_affected == 0 {
        return Err(not_found("Appointment not found", "APPOINTMENT_NOT_FOUND"));
    }

    info!(appointment_id = id, user_id = user.user_id, "Appointment deleted");
    Ok(Json(MessageResponse::new("Appointment deleted successfully")))
}
