pub mod delivery;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use thiserror::Error;
use tracing::info;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use frontdesk_auth::{AuthService, HashParams, PasswordError, PasswordHasher, TokenService};
use frontdesk_booking::BookingService;
use frontdesk_db::{SeaOrmAppointmentStore, SeaOrmCredentialStore};
use sea_orm::DatabaseConnection;

use crate::delivery::{OperatorDelivery, ResetTokenDelivery};
use crate::middleware::RoleGate;

/// Shortest accepted signing secret, in bytes
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Application state shared across handlers
pub struct AppState {
    pub db: DatabaseConnection,
    pub auth: Arc<AuthService>,
    pub booking: BookingService,
    pub allow_signup: bool,
    /// Upper bound on login, registration and booking
    pub request_timeout: Duration,
    pub reset_delivery: Arc<dyn ResetTokenDelivery>,
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Front Desk API",
        version = "0.1.0",
        description = "REST API for clinic staff accounts, patient records and appointment booking",
        contact(
            name = "Front Desk Team",
            email = "team@frontdesk.dev"
        )
    ),
    modifiers(&SecurityAddon),
    paths(
        handlers::system::health_check,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::get_current_user,
        handlers::auth::refresh_token,
        handlers::auth::change_password,
        handlers::auth::request_password_reset,
        handlers::auth::confirm_password_reset,
        handlers::patients::list_patients,
        handlers::patients::search_patients,
        handlers::patients::get_patient,
        handlers::patients::create_patient,
        handlers::patients::update_patient,
        handlers::patients::delete_patient,
        handlers::appointments::list_appointments,
        handlers::appointments::appointments_by_date,
        handlers::appointments::check_availability,
        handlers::appointments::get_appointment,
        handlers::appointments::appointments_by_patient,
        handlers::appointments::appointments_by_doctor,
        handlers::appointments::create_appointment,
        handlers::appointments::update_appointment_status,
        handlers::appointments::delete_appointment,
    ),
    components(
        schemas(
            models::HealthResponse,
            models::ErrorResponse,
            models::MessageResponse,
            models::UserRole,
            models::User,
            models::RegisterRequest,
            models::RegisterResponse,
            models::LoginRequest,
            models::LoginResponse,
            models::TokenResponse,
            models::ChangePasswordRequest,
            models::PasswordResetRequest,
            models::PasswordResetConfirmRequest,
            models::Patient,
            models::PatientRequest,
            models::PatientList,
            models::AppointmentStatus,
            models::Appointment,
            models::CreateAppointmentRequest,
            models::UpdateStatusRequest,
            models::AppointmentList,
            models::AvailabilityResponse,
        )
    ),
    tags(
        (name = "auth", description = "Staff accounts and session tokens"),
        (name = "patients", description = "Patient records"),
        (name = "appointments", description = "Appointment booking"),
        (name = "system", description = "System health and info endpoints")
    )
)]
struct ApiDoc;

/// API server configuration
pub struct ApiServerConfig {
    /// Address to bind the API server
    pub bind_addr: SocketAddr,
    /// Enable CORS (for development)
    pub enable_cors: bool,
    /// Allowed CORS origins (if None, allows localhost origins)
    pub cors_origins: Option<Vec<String>>,
    /// Secret for signing session tokens; reset tokens use a key derived from it
    pub jwt_secret: String,
    /// Whether `/api/auth/register` accepts new accounts
    pub allow_signup: bool,
    /// Deadline for login, registration and booking
    pub request_timeout: Duration,
    /// Argon2id work factor for new password hashes
    pub hash_params: HashParams,
    /// Where issued password-reset tokens are sent
    pub reset_delivery: Arc<dyn ResetTokenDelivery>,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            enable_cors: true,
            cors_origins: None,
            jwt_secret: String::new(),
            allow_signup: false,
            request_timeout: Duration::from_secs(10),
            hash_params: HashParams::default(),
            reset_delivery: Arc::new(OperatorDelivery),
        }
    }
}

/// Rejected server configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT secret is empty")]
    EmptySecret,

    #[error("JWT secret must be at least {min} bytes")]
    SecretTooShort { min: usize },

    #[error("invalid password hashing parameters: {0}")]
    Hashing(#[from] PasswordError),
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    /// Create a new API server over an already migrated database
    ///
    /// Fails when the signing secret is shorter than [`MIN_JWT_SECRET_LEN`].
    pub fn new(config: ApiServerConfig, db: DatabaseConnection) -> Result<Self, ConfigError> {
        if config.jwt_secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        if config.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::SecretTooShort {
                min: MIN_JWT_SECRET_LEN,
            });
        }

        let tokens = Arc::new(TokenService::new(config.jwt_secret.as_bytes()));
        let hasher = PasswordHasher::new(config.hash_params)?;

        let auth = AuthService::new(
            Arc::new(SeaOrmCredentialStore::new(db.clone())),
            hasher,
            tokens,
        );
        let booking = BookingService::new(Arc::new(SeaOrmAppointmentStore::new(db.clone())));

        let state = Arc::new(AppState {
            db,
            auth: Arc::new(auth),
            booking,
            allow_signup: config.allow_signup,
            request_timeout: config.request_timeout,
            reset_delivery: config.reset_delivery.clone(),
        });

        Ok(Self { config, state })
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        use handlers::{appointments, auth, patients, system};

        let api_doc = ApiDoc::openapi();

        let jwt_state = Arc::new(middleware::JwtState::new(self.state.auth.tokens().clone()));
        let front_desk =
            || axum_middleware::from_fn_with_state(RoleGate::FRONT_DESK, middleware::require_role);
        let staff = || axum_middleware::from_fn_with_state(RoleGate::STAFF, middleware::require_role);

        // Build PUBLIC routes (no authentication required)
        let public_router = Router::new()
            .route("/api/health", get(system::health_check))
            .route("/api/auth/register", post(auth::register))
            .route("/api/auth/login", post(auth::login))
            .route("/api/auth/password-reset", post(auth::request_password_reset))
            .route(
                "/api/auth/password-reset/confirm",
                post(auth::confirm_password_reset),
            )
            .with_state(self.state.clone());

        // Build PROTECTED routes (require session token authentication)
        let protected_router = Router::new()
            .route("/api/auth/me", get(auth::get_current_user))
            .route("/api/auth/refresh", post(auth::refresh_token))
            .route("/api/auth/change-password", post(auth::change_password))
            .route(
                "/api/patients",
                get(patients::list_patients)
                    .merge(post(patients::create_patient).route_layer(front_desk())),
            )
            .route("/api/patients/search", get(patients::search_patients))
            .route(
                "/api/patients/{id}",
                get(patients::get_patient)
                    .merge(put(patients::update_patient).route_layer(staff()))
                    .merge(delete(patients::delete_patient).route_layer(front_desk())),
            )
            .route(
                "/api/appointments",
                get(appointments::list_appointments)
                    .merge(post(appointments::create_appointment).route_layer(front_desk())),
            )
            .route("/api/appointments/date", get(appointments::appointments_by_date))
            .route(
                "/api/appointments/availability",
                get(appointments::check_availability),
            )
            .route(
                "/api/appointments/patient/{id}",
                get(appointments::appointments_by_patient),
            )
            .route(
                "/api/appointments/doctor/{id}",
                get(appointments::appointments_by_doctor),
            )
            .route(
                "/api/appointments/{id}",
                get(appointments::get_appointment).merge(
                    delete(appointments::delete_appointment)
                        .route_layer(front_desk()),
                ),
            )
            .route(
                "/api/appointments/{id}/status",
                patch(appointments::update_appointment_status).route_layer(staff()),
            )
            .with_state(self.state.clone())
            .layer(axum_middleware::from_fn_with_state(
                jwt_state,
                middleware::require_auth,
            ));

        let api_router = public_router.merge(protected_router);

        // SwaggerUi creates the /api/openapi.json route itself
        let router = Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", api_doc))
            .merge(api_router);

        let mut router = router.layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            router = router.layer(self.cors_layer());
        }

        router
    }

    fn cors_layer(&self) -> CorsLayer {
        let origin = match &self.config.cors_origins {
            Some(origins) => AllowOrigin::list(
                origins
                    .iter()
                    .filter_map(|o| HeaderValue::from_str(o).ok())
                    .collect::<Vec<_>>(),
            ),
            None => AllowOrigin::predicate(|origin: &HeaderValue, _| {
                // Allow common development origins
                let origin_str = origin.to_str().unwrap_or("");
                origin_str.starts_with("http://localhost:")
                    || origin_str.starts_with("http://127.0.0.1:")
                    || origin_str.starts_with("https://localhost:")
                    || origin_str.starts_with("https://127.0.0.1:")
            }),
        };

        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::PATCH,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_origin(origin)
    }

    /// Start the API server
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let router = self.build_router();

        info!("Starting API server on {}", self.config.bind_addr);
        info!(
            "OpenAPI spec: http://{}/api/openapi.json",
            self.config.bind_addr
        );
        info!("Swagger UI: http://{}/swagger-ui", self.config.bind_addr);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        axum::serve(listener, router)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }
}
