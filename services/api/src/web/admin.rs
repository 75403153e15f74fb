//! services/api/src/web/admin.rs
//!
//! Handlers for contacts, programs, employees, the dashboard totals and the
//! verification audit trail.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use utoipa::{IntoParams, ToSchema};
use veridant_core::domain::{
    Contact, ContactStatus, Employee, NewContact, NewEmployee, NewProgram, Program, ProgramUpdate,
    VerificationLog,
};
use veridant_core::ports::notify;
use veridant_core::stats::dashboard_stats;
use veridant_core::validation::{validate_contact, validate_employee, validate_program, Validator};
use veridant_core::{EmailKind, FieldError};

use crate::error::{AppError, AppResult, ErrorBody};
use crate::web::state::AppState;

const DEFAULT_LOG_LIMIT: i64 = 100;
const MAX_LOG_LIMIT: i64 = 1000;

//=========================================================================================
// Contacts
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ContactStatusRequest {
    /// `new`, `read` or `replied`.
    pub status: String,
}

#[derive(Serialize, ToSchema)]
pub struct ContactResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Contact> for ContactResponse {
    fn from(c: Contact) -> Self {
        Self {
            status: c.status.to_string(),
            id: c.id,
            name: c.name,
            email: c.email,
            phone: c.phone,
            subject: c.subject,
            message: c.message,
            created_at: c.created_at,
        }
    }
}

/// Public contact form.
#[utoipa::path(
    post,
    path = "/api/contacts",
    tag = "contacts",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Message received", body = ContactResponse),
        (status = 400, description = "Invalid submission", body = ErrorBody)
    )
)]
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ContactRequest>,
) -> AppResult<impl IntoResponse> {
    let contact = NewContact {
        name: req.name,
        email: req.email,
        phone: req.phone.filter(|p| !p.trim().is_empty()),
        subject: req.subject,
        message: req.message,
    };
    validate_contact(&contact)?;

    let created = state.db.create_contact(contact).await?;
    info!(contact_id = %created.id, "Contact form submitted");
    notify(
        state.email.as_ref(),
        EmailKind::ContactAcknowledgement,
        &created.email,
        &[
            ("name", created.name.clone()),
            ("subject", created.subject.clone()),
        ],
    )
    .await;

    Ok((StatusCode::CREATED, Json(ContactResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/api/contacts",
    tag = "contacts",
    responses((status = 200, description = "Contact submissions, newest first", body = [ContactResponse]))
)]
pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<ContactResponse>>> {
    let contacts = state.db.list_contacts().await?;
    Ok(Json(contacts.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    patch,
    path = "/api/contacts/{id}/status",
    tag = "contacts",
    params(("id" = Uuid, Path, description = "Contact id")),
    request_body = ContactStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ContactResponse),
        (status = 400, description = "Unknown status", body = ErrorBody),
        (status = 404, description = "No such contact", body = ErrorBody)
    )
)]
pub async fn update_contact_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ContactStatusRequest>,
) -> AppResult<Json<ContactResponse>> {
    let status: ContactStatus = req.status.trim().parse().map_err(
        |e: veridant_core::domain::ParseEnumError| {
            AppError::Validation(vec![FieldError::new("status", e.to_string())])
        },
    )?;
    let contact = state
        .db
        .update_contact_status(id, status)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Contact {id}")))?;
    Ok(Json(contact.into()))
}

//=========================================================================================
// Programs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct ProgramRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub department: String,
    pub duration_weeks: i32,
    pub stipend: Option<i64>,
    pub location: Option<String>,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct ProgramUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub department: Option<String>,
    pub duration_weeks: Option<i32>,
    pub stipend: Option<i64>,
    pub location: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Serialize, ToSchema)]
pub struct ProgramResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub department: String,
    pub duration_weeks: i32,
    pub stipend: Option<i64>,
    pub location: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Program> for ProgramResponse {
    fn from(p: Program) -> Self {
        Self {
            id: p.id,
            title: p.title,
            description: p.description,
            department: p.department,
            duration_weeks: p.duration_weeks,
            stipend: p.stipend,
            location: p.location,
            is_active: p.is_active,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/programs",
    tag = "programs",
    responses((status = 200, description = "Programs open for applications", body = [ProgramResponse]))
)]
pub async fn list_programs(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<ProgramResponse>>> {
    let programs = state.db.list_programs(true).await?;
    Ok(Json(programs.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/programs/{id}",
    tag = "programs",
    params(("id" = Uuid, Path, description = "Program id")),
    responses(
        (status = 200, description = "Program detail", body = ProgramResponse),
        (status = 404, description = "No such program", body = ErrorBody)
    )
)]
pub async fn get_program(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ProgramResponse>> {
    let program = state
        .db
        .get_program(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Program {id}")))?;
    Ok(Json(program.into()))
}

#[utoipa::path(
    post,
    path = "/api/programs",
    tag = "programs",
    request_body = ProgramRequest,
    responses(
        (status = 201, description = "Program created", body = ProgramResponse),
        (status = 400, description = "Invalid program", body = ErrorBody)
    )
)]
pub async fn create_program(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProgramRequest>,
) -> AppResult<impl IntoResponse> {
    let program = NewProgram {
        title: req.title,
        description: req.description,
        department: req.department,
        duration_weeks: req.duration_weeks,
        stipend: req.stipend,
        location: req.location,
    };
    validate_program(&program)?;

    let created = state.db.create_program(program).await?;
    info!(program_id = %created.id, title = %created.title, "Program created");
    Ok((StatusCode::CREATED, Json(ProgramResponse::from(created))))
}

#[utoipa::path(
    patch,
    path = "/api/programs/{id}",
    tag = "programs",
    params(("id" = Uuid, Path, description = "Program id")),
    request_body = ProgramUpdateRequest,
    responses(
        (status = 200, description = "Program updated", body = ProgramResponse),
        (status = 400, description = "Invalid update", body = ErrorBody),
        (status = 404, description = "No such program", body = ErrorBody)
    )
)]
pub async fn update_program(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProgramUpdateRequest>,
) -> AppResult<Json<ProgramResponse>> {
    let mut validator = Validator::new();
    if let Some(title) = &req.title {
        validator.required("title", title);
    }
    if let Some(department) = &req.department {
        validator.required("department", department);
    }
    validator
        .check(
            "duration_weeks",
            req.duration_weeks.is_none_or(|w| w > 0),
            "must be positive",
        )
        .check("stipend", req.stipend.is_none_or(|s| s >= 0), "must not be negative")
        .finish()?;

    let update = ProgramUpdate {
        title: req.title,
        description: req.description,
        department: req.department,
        duration_weeks: req.duration_weeks,
        stipend: req.stipend,
        location: req.location,
        is_active: req.is_active,
    };
    let program = state
        .db
        .update_program(id, update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Program {id}")))?;
    Ok(Json(program.into()))
}

//=========================================================================================
// Employees
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct EmployeeRequest {
    pub user_id: Option<Uuid>,
    pub full_name: String,
    pub email: String,
    pub designation: String,
    pub department: String,
    pub joining_date: NaiveDate,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeResponse {
    pub id: Uuid,
    /// `VAI-EMP-NNN`.
    pub employee_id: String,
    pub user_id: Option<Uuid>,
    pub full_name: String,
    pub email: String,
    pub designation: String,
    pub department: String,
    pub joining_date: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Employee> for EmployeeResponse {
    fn from(e: Employee) -> Self {
        Self {
            id: e.id,
            employee_id: e.employee_id,
            user_id: e.user_id,
            full_name: e.full_name,
            email: e.email,
            designation: e.designation,
            department: e.department,
            joining_date: e.joining_date,
            is_active: e.is_active,
            created_at: e.created_at,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/employees",
    tag = "employees",
    request_body = EmployeeRequest,
    responses(
        (status = 201, description = "Employee created", body = EmployeeResponse),
        (status = 400, description = "Invalid employee", body = ErrorBody)
    )
)]
pub async fn create_employee(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmployeeRequest>,
) -> AppResult<impl IntoResponse> {
    let employee = NewEmployee {
        user_id: req.user_id,
        full_name: req.full_name,
        email: req.email,
        designation: req.designation,
        department: req.department,
        joining_date: req.joining_date,
    };
    validate_employee(&employee)?;

    let created = state.db.create_employee(employee).await?;
    info!(employee_id = %created.employee_id, "Employee created");
    Ok((StatusCode::CREATED, Json(EmployeeResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/api/employees",
    tag = "employees",
    responses((status = 200, description = "All employees", body = [EmployeeResponse]))
)]
pub async fn list_employees(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<EmployeeResponse>>> {
    let employees = state.db.list_employees().await?;
    Ok(Json(employees.into_iter().map(Into::into).collect()))
}

//=========================================================================================
// Dashboard and Audit
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Serialize, ToSchema)]
pub struct DashboardStatsResponse {
    pub applications: i64,
    pub applications_by_status: Vec<StatusCount>,
    pub certificates: i64,
    pub offer_letters: i64,
    pub mous: i64,
    pub employees: i64,
    pub contacts: i64,
    pub programs: i64,
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    tag = "admin",
    responses((status = 200, description = "Totals per entity", body = DashboardStatsResponse))
)]
pub async fn admin_stats(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<DashboardStatsResponse>> {
    let stats = dashboard_stats(state.db.as_ref()).await?;
    Ok(Json(DashboardStatsResponse {
        applications: stats.applications,
        applications_by_status: stats
            .applications_by_status
            .into_iter()
            .map(|(status, count)| StatusCount {
                status: status.to_string(),
                count,
            })
            .collect(),
        certificates: stats.certificates,
        offer_letters: stats.offer_letters,
        mous: stats.mous,
        employees: stats.employees,
        contacts: stats.contacts,
        programs: stats.programs,
    }))
}

#[derive(Deserialize, IntoParams)]
pub struct LogQuery {
    /// At most this many entries, newest first (default 100, max 1000).
    pub limit: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct VerificationLogResponse {
    pub id: Uuid,
    pub document_type: String,
    pub document_id: String,
    pub token: String,
    pub requester_ip: Option<String>,
    pub user_agent: Option<String>,
    pub result: String,
    pub created_at: DateTime<Utc>,
}

impl From<VerificationLog> for VerificationLogResponse {
    fn from(l: VerificationLog) -> Self {
        Self {
            id: l.id,
            document_type: l.document_kind.to_string(),
            document_id: l.document_id,
            token: l.token,
            requester_ip: l.requester_ip,
            user_agent: l.user_agent,
            result: l.result.to_string(),
            created_at: l.created_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/verification-logs",
    tag = "admin",
    params(LogQuery),
    responses((status = 200, description = "Verification attempts, newest first", body = [VerificationLogResponse]))
)]
pub async fn list_verification_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogQuery>,
) -> AppResult<Json<Vec<VerificationLogResponse>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT);
    let logs = state.db.list_verification_logs(limit).await?;
    Ok(Json(logs.into_iter().map(Into::into).collect()))
}
