use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use frontdesk_auth::{IdentityProfile, Role};
use frontdesk_db::entities::patient;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database reachability ("ok" or "unavailable")
    pub database: String,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Plain acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================
// Auth
// ============================================================

/// Staff role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum UserRole {
    /// Registers patients and books appointments
    #[serde(rename = "front-desk")]
    FrontDesk,
    /// Treats patients
    #[serde(rename = "clinician")]
    Clinician,
}

impl From<Role> for UserRole {
    fn from(role: Role) -> Self {
        match role {
            Role::FrontDesk => UserRole::FrontDesk,
            Role::Clinician => UserRole::Clinician,
        }
    }
}

/// User information
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    /// Whether the account is active
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<IdentityProfile> for User {
    fn from(profile: IdentityProfile) -> Self {
        Self {
            id: profile.id,
            email: profile.email,
            name: profile.name,
            role: profile.role.into(),
            is_active: profile.is_active,
            created_at: profile.created_at,
        }
    }
}

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Email address (login handle)
    pub email: String,
    /// Password (at least 6 characters)
    pub password: String,
    /// Display name
    pub name: String,
    /// "front-desk" or "clinician"
    pub role: String,
}

/// User registration response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    /// Created user
    pub user: User,
    /// Session token
    pub token: String,
    /// Token expiration timestamp
    pub expires_at: DateTime<Utc>,
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// User email address
    pub email: String,
    /// User password
    pub password: String,
}

/// User login response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Logged in user
    pub user: User,
    /// Session token
    pub token: String,
    /// Token expiration timestamp
    pub expires_at: DateTime<Utc>,
}

/// Freshly issued session token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PasswordResetConfirmRequest {
    pub token: String,
    pub new_password: String,
}

// ============================================================
// Patients
// ============================================================

/// Patient record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Patient {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub address: Option<String>,
    pub medical_history: Option<String>,
    pub current_medication: Option<String>,
    pub allergies: Option<String>,
    pub emergency_contact: Option<String>,
    pub blood_group: Option<String>,
    pub insurance_number: Option<String>,
    pub registered_by: i32,
    pub last_updated_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<patient::Model> for Patient {
    fn from(model: patient::Model) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            phone: model.phone,
            date_of_birth: model.date_of_birth,
            gender: model.gender,
            address: model.address,
            medical_history: model.medical_history,
            current_medication: model.current_medication,
            allergies: model.allergies,
            emergency_contact: model.emergency_contact,
            blood_group: model.blood_group,
            insurance_number: model.insurance_number,
            registered_by: model.registered_by,
            last_updated_by: model.last_updated_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Create or replace a patient record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PatientRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub phone: String,
    /// YYYY-MM-DD
    pub date_of_birth: String,
    pub gender: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub medical_history: Option<String>,
    #[serde(default)]
    pub current_medication: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub blood_group: Option<String>,
    #[serde(default)]
    pub insurance_number: Option<String>,
}

/// Page of patients
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PatientList {
    pub patients: Vec<Patient>,
    /// Total number of patients
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

/// Pagination query parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PageQuery {
    /// 1-based page number (default: 1)
    pub page: Option<u64>,
    /// Page size (default: 10, max: 100)
    pub limit: Option<u64>,
}

impl PageQuery {
    pub const DEFAULT_LIMIT: u64 = 10;
    pub const MAX_LIMIT: u64 = 100;

    /// (page, limit) with defaults applied and limits clamped
    pub fn resolve(&self) -> (u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT);
        (page, limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchQuery {
    /// Substring matched against name, email and phone
    pub q: Option<String>,
}

// ============================================================
// Appointments
// ============================================================

/// Appointment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
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

/// Appointment
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Appointment {
    pub id: i32,
    pub patient_id: i32,
    /// Treating clinician (user id)
    pub doctor_id: i32,
    pub date: NaiveDate,
    /// Slot label, e.g. "09:00"
    pub time_slot: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<frontdesk_booking::Appointment> for Appointment {
    fn from(appt: frontdesk_booking::Appointment) -> Self {
        Self {
            id: appt.id,
            patient_id: appt.patient_id,
            doctor_id: appt.doctor_id,
            date: appt.date,
            time_slot: appt.time_slot,
            status: appt.status.into(),
            notes: appt.notes,
            created_by: appt.created_by,
            created_at: appt.created_at,
            updated_at: appt.updated_at,
        }
    }
}

/// Book an appointment
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAppointmentRequest {
    pub patient_id: i32,
    pub doctor_id: i32,
    /// YYYY-MM-DD
    pub date: String,
    /// Slot label; `time` is accepted as an alias
    #[serde(alias = "time")]
    pub time_slot: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// "scheduled", "completed" or "cancelled"
    pub status: String,
}

/// Page of appointments
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AppointmentList {
    pub appointments: Vec<Appointment>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DateQuery {
    /// YYYY-MM-DD
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityQuery {
    pub doctor_id: i32,
    /// YYYY-MM-DD
    pub date: String,
    pub time_slot: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityResponse {
    pub doctor_id: i32,
    pub date: NaiveDate,
    pub time_slot: String,
    pub available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_defaults_and_clamps() {
        assert_eq!(PageQuery::default().resolve(), (1, 10));
        assert_eq!(
            PageQuery {
                page: Some(0),
                limit: Some(0)
            }
            .resolve(),
            (1, 1)
        );
        assert_eq!(
            PageQuery {
                page: Some(3),
                limit: Some(5000)
            }
            .resolve(),
            (3, 100)
        );
    }

    #[test]
    fn test_create_appointment_accepts_time_alias() {
        let req: CreateAppointmentRequest = serde_json::from_str(
            r#"{"patient_id":1,"doctor_id":2,"date":"2024-03-01","time":"09:00"}"#,
        )
        .unwrap();
        assert_eq!(req.time_slot, "09:00");
        assert!(req.notes.is_none());
    }

    #[test]
    fn test_user_role_wire_format() {
        assert_eq!(
            serde_json::to_string(&UserRole::FrontDesk).unwrap(),
            "\"front-desk\""
        );
    }
}
