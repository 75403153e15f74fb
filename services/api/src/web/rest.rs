//! services/api/src/web/rest.rs
//!
//! Assembles the HTTP router and holds the master OpenAPI definition.

use crate::config::ConfigError;
use crate::error::{ApiError, ErrorBody, FieldErrorBody};
use crate::web::{admin, applications, auth, documents, messages, middleware, verify};
use crate::web::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    response::Json,
    routing::{get, patch, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        admin::submit_contact,
        admin::list_contacts,
        admin::update_contact_status,
        admin::list_programs,
        admin::get_program,
        admin::create_program,
        admin::update_program,
        applications::submit_application,
        applications::track_application,
        applications::my_applications,
        applications::list_applications,
        applications::get_application,
        applications::update_application_status,
        applications::application_history,
        documents::issue_certificate,
        documents::list_certificates,
        documents::download_certificate,
        documents::revoke_certificate,
        documents::issue_offer_letter,
        documents::list_offer_letters,
        documents::download_offer_letter,
        documents::respond_to_offer_letter,
        documents::issue_mou,
        documents::list_mous,
        documents::download_mou,
        documents::revoke_mou,
        admin::create_employee,
        admin::list_employees,
        messages::send_message,
        messages::list_messages,
        messages::mark_message_read,
        messages::submit_report,
        messages::list_reports,
        messages::review_report,
        verify::verify_certificate,
        verify::verify_offer_letter,
        verify::verify_mou,
        admin::list_verification_logs,
        admin::admin_stats,
    ),
    components(
        schemas(HealthResponse, ErrorBody, FieldErrorBody)
    ),
    tags(
        (name = "auth", description = "Accounts and sessions."),
        (name = "contacts", description = "Public contact form and its inbox."),
        (name = "programs", description = "Internship programs."),
        (name = "applications", description = "Application intake and review."),
        (name = "documents", description = "Certificates, offer letters and college MoUs."),
        (name = "employees", description = "Staff records."),
        (name = "messages", description = "Messages between users."),
        (name = "reports", description = "Weekly intern reports."),
        (name = "verification", description = "Public document verification."),
        (name = "admin", description = "Dashboard and audit trail.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Health
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "The service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

//=========================================================================================
// Router
//=========================================================================================

/// Builds the complete application: public, signed-in and admin routes, the
/// Swagger UI and the CORS policy.
pub fn build_router(state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = state.config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string())
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/api/auth/signup", post(auth::signup_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/contacts", post(admin::submit_contact))
        .route("/api/programs", get(admin::list_programs))
        .route("/api/programs/{id}", get(admin::get_program))
        .route("/api/applications", post(applications::submit_application))
        .route(
            "/api/track/{application_number}",
            get(applications::track_application),
        )
        .route("/api/verify/certificate/{token}", get(verify::verify_certificate))
        .route("/api/verify/offer/{token}", get(verify::verify_offer_letter))
        .route("/api/verify/mou/{token}", get(verify::verify_mou));

    // Signed-in routes; ownership is checked by the handlers
    let session_routes = Router::new()
        .route("/api/auth/logout", post(auth::logout_handler))
        .route("/api/auth/me", get(auth::me_handler))
        .route("/api/applications/mine", get(applications::my_applications))
        .route(
            "/api/applications/{id}/reports",
            get(messages::list_reports),
        )
        .route(
            "/api/certificates/{id}/download",
            get(documents::download_certificate),
        )
        .route(
            "/api/offer-letters/{id}/download",
            get(documents::download_offer_letter),
        )
        .route(
            "/api/offer-letters/{id}/respond",
            patch(documents::respond_to_offer_letter),
        )
        .route(
            "/api/messages",
            post(messages::send_message).get(messages::list_messages),
        )
        .route("/api/messages/{id}/read", patch(messages::mark_message_read))
        .route("/api/reports", post(messages::submit_report))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let admin_routes = Router::new()
        .route("/api/admin/stats", get(admin::admin_stats))
        .route("/api/verification-logs", get(admin::list_verification_logs))
        .route("/api/contacts", get(admin::list_contacts))
        .route(
            "/api/contacts/{id}/status",
            patch(admin::update_contact_status),
        )
        .route("/api/programs", post(admin::create_program))
        .route("/api/programs/{id}", patch(admin::update_program))
        .route("/api/applications", get(applications::list_applications))
        .route("/api/applications/{id}", get(applications::get_application))
        .route(
            "/api/applications/{id}/status",
            patch(applications::update_application_status),
        )
        .route(
            "/api/applications/{id}/history",
            get(applications::application_history),
        )
        .route(
            "/api/certificates",
            post(documents::issue_certificate).get(documents::list_certificates),
        )
        .route(
            "/api/certificates/{id}/revoke",
            patch(documents::revoke_certificate),
        )
        .route(
            "/api/offer-letters",
            post(documents::issue_offer_letter).get(documents::list_offer_letters),
        )
        .route(
            "/api/mous",
            post(documents::issue_mou).get(documents::list_mous),
        )
        .route("/api/mous/{id}/download", get(documents::download_mou))
        .route("/api/mous/{id}/revoke", patch(documents::revoke_mou))
        .route(
            "/api/employees",
            post(admin::create_employee).get(admin::list_employees),
        )
        .route("/api/reports/{id}/review", patch(messages::review_report))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_admin,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(admin_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state);

    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
