//! services/api/src/web/messages.rs
//!
//! Internal messages between users and weekly internship reports.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use utoipa::ToSchema;
use veridant_core::domain::{Actor, Message, NewMessage, NewReport, Report};
use veridant_core::validation::Validator;

use crate::error::{AppError, AppResult, ErrorBody};
use crate::web::state::AppState;

//=========================================================================================
// Messages
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub recipient_id: Uuid,
    pub subject: String,
    pub body: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub subject: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            sender_id: m.sender_id,
            recipient_id: m.recipient_id,
            subject: m.subject,
            body: m.body,
            is_read: m.is_read,
            created_at: m.created_at,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/messages",
    tag = "messages",
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message sent", body = MessageResponse),
        (status = 400, description = "Invalid message", body = ErrorBody),
        (status = 404, description = "Unknown recipient", body = ErrorBody)
    )
)]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<impl IntoResponse> {
    Validator::new()
        .required("subject", &req.subject)
        .required("body", &req.body)
        .finish()?;

    if state.db.get_user_by_id(req.recipient_id).await?.is_none() {
        return Err(AppError::NotFound(format!("User {}", req.recipient_id)));
    }

    let message = state
        .db
        .create_message(NewMessage {
            sender_id: actor.user_id,
            recipient_id: req.recipient_id,
            subject: req.subject.trim().to_string(),
            body: req.body,
        })
        .await?;
    info!(message_id = %message.id, "Message sent");
    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}

/// Messages sent to or by the caller, newest first.
#[utoipa::path(
    get,
    path = "/api/messages",
    tag = "messages",
    responses((status = 200, description = "The caller's messages", body = [MessageResponse]))
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> AppResult<Json<Vec<MessageResponse>>> {
    let messages = state.db.list_messages_for_user(actor.user_id).await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    patch,
    path = "/api/messages/{id}/read",
    tag = "messages",
    params(("id" = Uuid, Path, description = "Message id")),
    responses(
        (status = 200, description = "Marked read", body = MessageResponse),
        (status = 404, description = "No such message for this recipient", body = ErrorBody)
    )
)]
pub async fn mark_message_read(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let message = state
        .db
        .mark_message_read(id, actor.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Message {id}")))?;
    Ok(Json(message.into()))
}

//=========================================================================================
// Weekly Reports
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SubmitReportRequest {
    pub application_id: Uuid,
    pub week_number: i32,
    pub summary: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ReviewReportRequest {
    pub feedback: String,
}

#[derive(Serialize, ToSchema)]
pub struct ReportResponse {
    pub id: Uuid,
    pub application_id: Uuid,
    pub submitted_by: Uuid,
    pub week_number: i32,
    pub summary: String,
    pub status: String,
    pub feedback: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl From<Report> for ReportResponse {
    fn from(r: Report) -> Self {
        Self {
            status: r.status.to_string(),
            id: r.id,
            application_id: r.application_id,
            submitted_by: r.submitted_by,
            week_number: r.week_number,
            summary: r.summary,
            feedback: r.feedback,
            reviewed_by: r.reviewed_by,
            created_at: r.created_at,
            reviewed_at: r.reviewed_at,
        }
    }
}

/// Returns the application's owner, or 404 if it does not exist.
async fn application_owner(state: &AppState, application_id: Uuid) -> AppResult<Option<Uuid>> {
    let application = state
        .db
        .get_application(application_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {application_id}")))?;
    Ok(application.user_id)
}

/// Interns submit one report per week against their own application.
#[utoipa::path(
    post,
    path = "/api/reports",
    tag = "reports",
    request_body = SubmitReportRequest,
    responses(
        (status = 201, description = "Report submitted", body = ReportResponse),
        (status = 400, description = "Invalid report", body = ErrorBody),
        (status = 403, description = "Not the applicant", body = ErrorBody),
        (status = 404, description = "No such application", body = ErrorBody)
    )
)]
pub async fn submit_report(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<SubmitReportRequest>,
) -> AppResult<impl IntoResponse> {
    Validator::new()
        .check("week_number", req.week_number >= 1, "must be at least 1")
        .required("summary", &req.summary)
        .finish()?;

    if application_owner(&state, req.application_id).await? != Some(actor.user_id) {
        return Err(AppError::Forbidden);
    }

    let report = state
        .db
        .create_report(NewReport {
            application_id: req.application_id,
            submitted_by: actor.user_id,
            week_number: req.week_number,
            summary: req.summary,
        })
        .await?;
    info!(report_id = %report.id, week = report.week_number, "Weekly report submitted");
    Ok((StatusCode::CREATED, Json(ReportResponse::from(report))))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}/reports",
    tag = "reports",
    params(("id" = Uuid, Path, description = "Application id")),
    responses(
        (status = 200, description = "Reports by week", body = [ReportResponse]),
        (status = 403, description = "Not the applicant", body = ErrorBody),
        (status = 404, description = "No such application", body = ErrorBody)
    )
)]
pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<ReportResponse>>> {
    if !actor.can_access(application_owner(&state, id).await?) {
        return Err(AppError::Forbidden);
    }
    let reports = state.db.list_reports_for_application(id).await?;
    Ok(Json(reports.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    patch,
    path = "/api/reports/{id}/review",
    tag = "reports",
    params(("id" = Uuid, Path, description = "Report id")),
    request_body = ReviewReportRequest,
    responses(
        (status = 200, description = "Report reviewed", body = ReportResponse),
        (status = 400, description = "Missing feedback", body = ErrorBody),
        (status = 404, description = "No such report", body = ErrorBody)
    )
)]
pub async fn review_report(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewReportRequest>,
) -> AppResult<Json<ReportResponse>> {
    Validator::new().required("feedback", &req.feedback).finish()?;

    let report = state
        .db
        .review_report(id, actor.user_id, req.feedback.trim())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Report {id}")))?;
    Ok(Json(report.into()))
}
