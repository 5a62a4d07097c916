//! Patient record handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{debug, info};

use frontdesk_db::entities::patient::{self, Column};

use super::auth::looks_like_email;
use crate::error::{bad_request, db_error, not_found, ApiError};
use crate::middleware::AuthUser;
use crate::models::*;
use crate::AppState;

/// Normalized and validated patient fields
struct PatientFields {
    first_name: String,
    last_name: String,
    email: Option<String>,
    phone: String,
    date_of_birth: NaiveDate,
    gender: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate(req: &PatientRequest) -> Result<PatientFields, ApiError> {
    let required = [
        ("first_name", &req.first_name),
        ("last_name", &req.last_name),
        ("phone", &req.phone),
        ("gender", &req.gender),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(bad_request(
                format!("Field '{}' is required", field),
                "VALIDATION_ERROR",
            ));
        }
    }

    let email = non_blank(req.email.clone());
    if let Some(email) = &email {
        if !looks_like_email(email) {
            return Err(bad_request("Invalid email address", "INVALID_EMAIL"));
        }
    }

    let date_of_birth = NaiveDate::parse_from_str(&req.date_of_birth, "%Y-%m-%d")
        .map_err(|_| bad_request("Invalid date format, expected YYYY-MM-DD", "INVALID_DATE"))?;
    if date_of_birth > Utc::now().date_naive() {
        return Err(bad_request("Date of birth is in the future", "INVALID_DATE"));
    }

    Ok(PatientFields {
        first_name: req.first_name.trim().to_string(),
        last_name: req.last_name.trim().to_string(),
        email,
        phone: req.phone.trim().to_string(),
        date_of_birth,
        gender: req.gender.trim().to_string(),
    })
}

fn apply(model: &mut patient::ActiveModel, fields: PatientFields, req: PatientRequest) {
    model.first_name = Set(fields.first_name);
    model.last_name = Set(fields.last_name);
    model.email = Set(fields.email);
    model.phone = Set(fields.phone);
    model.date_of_birth = Set(fields.date_of_birth);
    model.gender = Set(fields.gender);
    model.address = Set(non_blank(req.address));
    model.medical_history = Set(non_blank(req.medical_history));
    model.current_medication = Set(non_blank(req.current_medication));
    model.allergies = Set(non_blank(req.allergies));
    model.emergency_contact = Set(non_blank(req.emergency_contact));
    model.blood_group = Set(non_blank(req.blood_group));
    model.insurance_number = Set(non_blank(req.insurance_number));
}

fn write_error(err: sea_orm::DbErr) -> ApiError {
    if matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    ) {
        return bad_request("A patient with this email already exists", "EMAIL_EXISTS");
    }
    db_error(err)
}

/// List patients, newest first
#[utoipa::path(
    get,
    path = "/api/patients",
    params(
        ("page" = Option<u64>, Query, description = "Page number, 1-based (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Page size (default: 10, max: 100)")
    ),
    responses(
        (status = 200, description = "Page of patients", body = PatientList),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "patients"
)]
pub async fn list_patients(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PatientList>, ApiError> {
    let (page, limit) = query.resolve();
    debug!(page, limit, "Listing patients");

    let paginator = patient::Entity::find()
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id)
        .paginate(&state.db, limit);

    let total = paginator.num_items().await.map_err(db_error)?;
    let patients = paginator.fetch_page(page - 1).await.map_err(db_error)?;

    Ok(Json(PatientList {
        patients: patients.into_iter().map(Patient::from).collect(),
        total,
        page,
        limit,
    }))
}

/// Search patients by name, email or phone (case-insensitive substring)
#[utoipa::path(
    get,
    path = "/api/patients/search",
    params(
        ("q" = String, Query, description = "Search text")
    ),
    responses(
        (status = 200, description = "Matching patients", body = [Patient]),
        (status = 400, description = "Missing search text", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "patients"
)]
pub async fn search_patients(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let needle = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| bad_request("Search query required", "MISSING_QUERY"))?;

    let pattern = format!("%{}%", needle.to_lowercase());
    let condition = [
        Column::FirstName,
        Column::LastName,
        Column::Email,
        Column::Phone,
    ]
    .into_iter()
    .fold(Condition::any(), |cond, column| {
        cond.add(Expr::expr(Func::lower(Expr::col(column))).like(pattern.as_str()))
    });

    let patients = patient::Entity::find()
        .filter(condition)
        .order_by_asc(Column::LastName)
        .order_by_asc(Column::FirstName)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    Ok(Json(patients.into_iter().map(Patient::from).collect()))
}

/// Get a patient record
#[utoipa::path(
    get,
    path = "/api/patients/{id}",
    params(
        ("id" = i32, Path, description = "Patient ID")
    ),
    responses(
        (status = 200, description = "Patient record", body = Patient),
        (status = 404, description = "Patient not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "patients"
)]
pub async fn get_patient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<Patient>, ApiError> {
    let found = patient::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Patient not found", "PATIENT_NOT_FOUND"))?;

    Ok(Json(found.into()))
}

/// Register a patient (front desk only)
#[utoipa::path(
    post,
    path = "/api/patients",
    request_body = PatientRequest,
    responses(
        (status = 201, description = "Patient created", body = Patient),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Role not permitted", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "patients"
)]
pub async fn create_patient(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<PatientRequest>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let fields = validate(&req)?;
    let now = Utc::now();

    let mut model = patient::ActiveModel {
        registered_by: Set(user.user_id),
        last_updated_by: Set(user.user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    apply(&mut model, fields, req);

    let created = model.insert(&state.db).await.map_err(write_error)?;
    info!(patient_id = created.id, user_id = user.user_id, "Patient registered");

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Replace a patient record
#[utoipa::path(
    put,
    path = "/api/patients/{id}",
    params(
        ("id" = i32, Path, description = "Patient ID")
    ),
    request_body = PatientRequest,
    responses(
        (status = 200, description = "Patient updated", body = Patient),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Patient not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "patients"
)]
pub async fn update_patient(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(req): Json<PatientRequest>,
) -> Result<Json<Patient>, ApiError> {
    let fields = validate(&req)?;

    let existing = patient::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Patient not found", "PATIENT_NOT_FOUND"))?;

    let mut model = existing.into_active_model();
    apply(&mut model, fields, req);
    model.last_updated_by = Set(user.user_id);
    model.updated_at = Set(Utc::now());

    let updated = model.update(&state.db).await.map_err(write_error)?;
    info!(patient_id = id, user_id = user.user_id, "Patient updated");

    Ok(Json(updated.into()))
}

/// Delete a patient and their appointments (front desk only)
#[utoipa::path(
    delete,
    path = "/api/patients/{id}",
    params(
        ("id" = i32, Path, description = "Patient ID")
    ),
    responses(
        (status = 200, description = "Patient deleted", body = MessageResponse),
        (status = 403, description = "Role not permitted", body = ErrorResponse),
        (status = 404, description = "Patient not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "patients"
)]
pub async fn delete_patient(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = patient::Entity::delete_by_id(id)
        .exec(&state.db)
        .await
        .map_err(db_error)?;

    if result.rows_affected == 0 {
        return Err(not_found("Patient not found", "PATIENT_NOT_FOUND"));
    }

    info!(patient_id = id, user_id = user.user_id, "Patient deleted");
    Ok(Json(MessageResponse::new("Patient deleted successfully")))
}
