//! services/api/src/web/applications.rs
//!
//! Handlers for submitting, tracking and reviewing internship applications.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use utoipa::{IntoParams, ToSchema};
use veridant_core::domain::{
    Actor, ApplicationFilter, InternshipApplication, NewApplication, StatusHistoryEntry,
};
use veridant_core::{ApplicationStatus, FieldError, TransitionRequest};

use crate::error::{AppError, AppResult, ErrorBody};
use crate::web::middleware::resolve_actor;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SubmitApplicationRequest {
    pub program_id: Option<Uuid>,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: Option<NaiveDate>,
    pub college_name: String,
    pub degree: String,
    pub branch: Option<String>,
    pub graduation_year: Option<i32>,
    pub cgpa: Option<String>,
    pub resume_url: Option<String>,
    pub id_proof_url: Option<String>,
    pub marksheet_url: Option<String>,
    pub cover_letter: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct SubmitApplicationResponse {
    pub id: Uuid,
    pub application_number: String,
    pub status: String,
}

/// What an applicant sees when tracking by application number.
#[derive(Serialize, ToSchema)]
pub struct TrackApplicationResponse {
    pub application_number: String,
    pub status: String,
    pub program: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status_notes: Option<String>,
    pub interview_at: Option<DateTime<Utc>>,
    pub interview_mode: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub application_number: String,
    pub user_id: Option<Uuid>,
    pub program_id: Option<Uuid>,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: Option<NaiveDate>,
    pub college_name: String,
    pub degree: String,
    pub branch: Option<String>,
    pub graduation_year: Option<i32>,
    pub cgpa: Option<String>,
    pub resume_url: Option<String>,
    pub id_proof_url: Option<String>,
    pub marksheet_url: Option<String>,
    pub cover_letter: Option<String>,
    pub status: String,
    pub status_notes: Option<String>,
    pub interview_at: Option<DateTime<Utc>>,
    pub interview_mode: Option<String>,
    pub interview_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<InternshipApplication> for ApplicationResponse {
    fn from(a: InternshipApplication) -> Self {
        Self {
            status: a.status.to_string(),
            id: a.id,
            application_number: a.application_number,
            user_id: a.user_id,
            program_id: a.program_id,
            full_name: a.full_name,
            email: a.email,
            phone: a.phone,
            date_of_birth: a.date_of_birth,
            college_name: a.college_name,
            degree: a.degree,
            branch: a.branch,
            graduation_year: a.graduation_year,
            cgpa: a.cgpa,
            resume_url: a.resume_url,
            id_proof_url: a.id_proof_url,
            marksheet_url: a.marksheet_url,
            cover_letter: a.cover_letter,
            status_notes: a.status_notes,
            interview_at: a.interview_at,
            interview_mode: a.interview_mode,
            interview_link: a.interview_link,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Deserialize, IntoParams)]
pub struct ApplicationListQuery {
    pub status: Option<String>,
    pub program_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub notes: Option<String>,
    pub interview_at: Option<DateTime<Utc>>,
    pub interview_mode: Option<String>,
    pub interview_link: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct StatusHistoryResponse {
    pub id: Uuid,
    pub previous_status: Option<String>,
    pub new_status: String,
    pub changed_by: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<StatusHistoryEntry> for StatusHistoryResponse {
    fn from(h: StatusHistoryEntry) -> Self {
        Self {
            id: h.id,
            previous_status: h.previous_status.map(|s| s.to_string()),
            new_status: h.new_status.to_string(),
            changed_by: h.changed_by,
            notes: h.notes,
            created_at: h.created_at,
        }
    }
}

fn parse_status(field: &'static str, raw: &str) -> AppResult<ApplicationStatus> {
    raw.trim()
        .parse()
        .map_err(|e: veridant_core::domain::ParseEnumError| {
            AppError::Validation(vec![FieldError::new(field, e.to_string())])
        })
}

//=========================================================================================
// Public Handlers
//=========================================================================================

/// Submit an application. Signed-in candidates get it linked to their account.
#[utoipa::path(
    post,
    path = "/api/applications",
    tag = "applications",
    request_body = SubmitApplicationRequest,
    responses(
        (status = 201, description = "Application submitted", body = SubmitApplicationResponse),
        (status = 400, description = "Invalid application", body = ErrorBody)
    )
)]
pub async fn submit_application(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SubmitApplicationRequest>,
) -> AppResult<impl IntoResponse> {
    let actor = resolve_actor(&state, &headers).await?;

    let application = NewApplication {
        user_id: actor.map(|a| a.user_id),
        program_id: req.program_id,
        full_name: req.full_name,
        email: req.email,
        phone: req.phone,
        date_of_birth: req.date_of_birth,
        college_name: req.college_name,
        degree: req.degree,
        branch: req.branch,
        graduation_year: req.graduation_year,
        cgpa: req.cgpa,
        resume_url: req.resume_url,
        id_proof_url: req.id_proof_url,
        marksheet_url: req.marksheet_url,
        cover_letter: req.cover_letter,
    };
    let created = state.applications.submit(application).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitApplicationResponse {
            id: created.id,
            application_number: created.application_number,
            status: created.status.to_string(),
        }),
    ))
}

/// Look up an application's progress by its number.
#[utoipa::path(
    get,
    path = "/api/track/{application_number}",
    tag = "applications",
    params(("application_number" = String, Path, description = "e.g. VAI-2026-0001")),
    responses(
        (status = 200, description = "Application status", body = TrackApplicationResponse),
        (status = 404, description = "No such application", body = ErrorBody)
    )
)]
pub async fn track_application(
    State(state): State<Arc<AppState>>,
    Path(application_number): Path<String>,
) -> AppResult<Json<TrackApplicationResponse>> {
    let application = state.applications.track(&application_number).await?;
    let program = match application.program_id {
        Some(program_id) => state.db.get_program(program_id).await?.map(|p| p.title),
        None => None,
    };

    Ok(Json(TrackApplicationResponse {
        application_number: application.application_number,
        status: application.status.to_string(),
        program,
        submitted_at: application.created_at,
        updated_at: application.updated_at,
        status_notes: application.status_notes,
        interview_at: application.interview_at,
        interview_mode: application.interview_mode,
    }))
}

//=========================================================================================
// Signed-in Handlers
//=========================================================================================

/// The caller's own applications.
#[utoipa::path(
    get,
    path = "/api/applications/mine",
    tag = "applications",
    responses(
        (status = 200, description = "Applications of the current user", body = [ApplicationResponse]),
        (status = 401, description = "Not signed in", body = ErrorBody)
    )
)]
pub async fn my_applications(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> AppResult<Json<Vec<ApplicationResponse>>> {
    let filter = ApplicationFilter {
        user_id: Some(actor.user_id),
        ..Default::default()
    };
    let applications = state.db.list_applications(filter).await?;
    Ok(Json(applications.into_iter().map(Into::into).collect()))
}

//=========================================================================================
// Admin Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/api/applications",
    tag = "applications",
    params(ApplicationListQuery),
    responses(
        (status = 200, description = "Matching applications, newest first", body = [ApplicationResponse]),
        (status = 400, description = "Unknown status filter", body = ErrorBody),
        (status = 403, description = "Admins only", body = ErrorBody)
    )
)]
pub async fn list_applications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ApplicationListQuery>,
) -> AppResult<Json<Vec<ApplicationResponse>>> {
    let status = query
        .status
        .as_deref()
        .map(|s| parse_status("status", s))
        .transpose()?;
    let filter = ApplicationFilter {
        status,
        program_id: query.program_id,
        user_id: query.user_id,
    };
    let applications = state.db.list_applications(filter).await?;
    Ok(Json(applications.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Application id")),
    responses(
        (status = 200, description = "Application detail", body = ApplicationResponse),
        (status = 404, description = "No such application", body = ErrorBody)
    )
)]
pub async fn get_application(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApplicationResponse>> {
    let application = state
        .db
        .get_application(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {id}")))?;
    Ok(Json(application.into()))
}

/// Move an application to a new status. Writes one history entry.
#[utoipa::path(
    patch,
    path = "/api/applications/{id}/status",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Application id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApplicationResponse),
        (status = 400, description = "Unknown status", body = ErrorBody),
        (status = 404, description = "No such application", body = ErrorBody),
        (status = 409, description = "Transition not allowed", body = ErrorBody)
    )
)]
pub async fn update_application_status(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> AppResult<Json<ApplicationResponse>> {
    let request = TransitionRequest {
        status: parse_status("status", &req.status)?,
        actor: Some(actor.user_id),
        notes: req.notes.filter(|n| !n.trim().is_empty()),
        interview_at: req.interview_at,
        interview_mode: req.interview_mode,
        interview_link: req.interview_link,
    };
    let updated = state.applications.transition(id, request).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}/history",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Application id")),
    responses(
        (status = 200, description = "Status history, oldest first", body = [StatusHistoryResponse]),
        (status = 404, description = "No such application", body = ErrorBody)
    )
)]
pub async fn application_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<StatusHistoryResponse>>> {
    let history = state.applications.history(id).await?;
    Ok(Json(history.into_iter().map(Into::into).collect()))
}
