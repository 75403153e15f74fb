//! services/api/src/web/documents.rs
//!
//! Handlers for issuing, listing, downloading and revoking certificates, offer
//! letters and college MoUs.
//!
//! Certificates and offer letters for an application may only be issued once
//! the application is `selected` or `completed`; that check lives here.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use utoipa::ToSchema;
use veridant_core::domain::{
    Actor, Certificate, CollegeMou, InternshipApplication, NewMou, OfferDecision, OfferLetter,
};
use veridant_core::issuance::{
    certificate_for_application, certificate_for_employee, offer_for_application,
    CertificateDetails, OfferDetails,
};
use veridant_core::{FieldError, Issued, RenderableDocument};

use crate::error::{AppError, AppResult, ErrorBody};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct IssueCertificateRequest {
    /// Exactly one of `application_id` and `employee_id` must be set.
    pub application_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
    pub certificate_type: Option<String>,
    pub program_title: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub grade: Option<String>,
    pub mentor_name: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct IssueOfferLetterRequest {
    pub application_id: Uuid,
    pub position: String,
    pub department: Option<String>,
    pub stipend: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Deserialize, ToSchema)]
pub struct IssueMouRequest {
    pub college_name: String,
    pub college_address: String,
    pub college_signatory: String,
    pub college_email: Option<String>,
    pub company_signatory: String,
    pub purpose: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Deserialize, ToSchema)]
pub struct RevokeRequest {
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RespondToOfferRequest {
    /// `accept` or `reject`.
    pub decision: String,
}

#[derive(Serialize, ToSchema)]
pub struct CertificateResponse {
    pub id: Uuid,
    pub certificate_number: String,
    pub verification_token: String,
    pub verification_url: String,
    pub application_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
    pub recipient_name: String,
    pub recipient_email: Option<String>,
    pub program_title: String,
    pub certificate_type: String,
    pub issue_date: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub grade: Option<String>,
    pub mentor_name: Option<String>,
    pub status: String,
    pub revoked_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CertificateResponse {
    fn new(c: Certificate, base_url: &str) -> Self {
        Self {
            verification_url: RenderableDocument::Certificate(&c).verification_url(base_url),
            status: c.status.to_string(),
            id: c.id,
            certificate_number: c.certificate_number,
            verification_token: c.verification_token,
            application_id: c.application_id,
            employee_id: c.employee_id,
            recipient_name: c.recipient_name,
            recipient_email: c.recipient_email,
            program_title: c.program_title,
            certificate_type: c.certificate_type,
            issue_date: c.issue_date,
            valid_until: c.valid_until,
            grade: c.grade,
            mentor_name: c.mentor_name,
            revoked_reason: c.revoked_reason,
            created_at: c.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct OfferLetterResponse {
    pub id: Uuid,
    pub offer_number: String,
    pub verification_token: String,
    pub verification_url: String,
    pub application_id: Option<Uuid>,
    pub candidate_name: String,
    pub candidate_email: String,
    pub position: String,
    pub department: String,
    pub stipend: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub accepted_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OfferLetterResponse {
    fn new(o: OfferLetter, base_url: &str) -> Self {
        Self {
            verification_url: RenderableDocument::OfferLetter(&o).verification_url(base_url),
            status: o.status.to_string(),
            id: o.id,
            offer_number: o.offer_number,
            verification_token: o.verification_token,
            application_id: o.application_id,
            candidate_name: o.candidate_name,
            candidate_email: o.candidate_email,
            position: o.position,
            department: o.department,
            stipend: o.stipend,
            start_date: o.start_date,
            end_date: o.end_date,
            accepted_at: o.accepted_at,
            rejected_at: o.rejected_at,
            created_at: o.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MouResponse {
    pub id: Uuid,
    pub mou_number: String,
    pub verification_token: String,
    pub verification_url: String,
    pub college_name: String,
    pub college_address: String,
    pub college_signatory: String,
    pub college_email: Option<String>,
    pub company_signatory: String,
    pub purpose: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub revoked_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MouResponse {
    fn new(m: CollegeMou, base_url: &str) -> Self {
        Self {
            verification_url: RenderableDocument::Mou(&m).verification_url(base_url),
            status: m.status.to_string(),
            id: m.id,
            mou_number: m.mou_number,
            verification_token: m.verification_token,
            college_name: m.college_name,
            college_address: m.college_address,
            college_signatory: m.college_signatory,
            college_email: m.college_email,
            company_signatory: m.company_signatory,
            purpose: m.purpose,
            start_date: m.start_date,
            end_date: m.end_date,
            revoked_reason: m.revoked_reason,
            created_at: m.created_at,
        }
    }
}

/// An issued document plus whether its PDF could be produced right away.
#[derive(Serialize, ToSchema)]
pub struct IssuedResponse<T> {
    #[serde(flatten)]
    pub document: T,
    pub pdf_rendered: bool,
}

fn issued<T, R>(issued: Issued<T>, to_response: impl FnOnce(T) -> R) -> IssuedResponse<R> {
    IssuedResponse {
        pdf_rendered: issued.artifact.is_some(),
        document: to_response(issued.record),
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn pdf_response(reference: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{reference}.pdf\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// Loads the application a document is issued for and checks it has reached
/// a status that allows issuance.
async fn issuable_application(
    state: &AppState,
    application_id: Uuid,
) -> AppResult<InternshipApplication> {
    let application = state
        .db
        .get_application(application_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {application_id}")))?;
    if !application.status.allows_document_issuance() {
        return Err(AppError::Conflict(format!(
            "Application {} is '{}'; documents can only be issued once it is selected or completed",
            application.application_number, application.status
        )));
    }
    Ok(application)
}

async fn certificate_owner(state: &AppState, certificate: &Certificate) -> AppResult<Option<Uuid>> {
    if let Some(application_id) = certificate.application_id {
        return Ok(state
            .db
            .get_application(application_id)
            .await?
            .and_then(|a| a.user_id));
    }
    if let Some(employee_id) = certificate.employee_id {
        return Ok(state.db.get_employee(employee_id).await?.and_then(|e| e.user_id));
    }
    Ok(None)
}

//=========================================================================================
// Certificates
//=========================================================================================

#[utoipa::path(
    post,
    path = "/api/certificates",
    tag = "documents",
    request_body = IssueCertificateRequest,
    responses(
        (status = 201, description = "Certificate issued", body = IssuedResponse<CertificateResponse>),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 404, description = "Application or employee not found", body = ErrorBody),
        (status = 409, description = "Application not eligible or already certified", body = ErrorBody)
    )
)]
pub async fn issue_certificate(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<IssueCertificateRequest>,
) -> AppResult<impl IntoResponse> {
    let details = CertificateDetails {
        certificate_type: req.certificate_type.filter(|t| !t.trim().is_empty()),
        program_title: req.program_title.filter(|t| !t.trim().is_empty()),
        issue_date: req.issue_date,
        valid_until: req.valid_until,
        grade: req.grade,
        mentor_name: req.mentor_name,
    };

    let draft = match (req.application_id, req.employee_id) {
        (Some(application_id), None) => {
            let application = issuable_application(&state, application_id).await?;
            let program = match application.program_id {
                Some(program_id) => state.db.get_program(program_id).await?,
                None => None,
            };
            certificate_for_application(
                &application,
                program.as_ref(),
                details,
                Some(actor.user_id),
            )
        }
        (None, Some(employee_id)) => {
            let employee = state
                .db
                .get_employee(employee_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Employee {employee_id}")))?;
            certificate_for_employee(&employee, details, Some(actor.user_id))
        }
        _ => {
            return Err(AppError::Validation(vec![FieldError::new(
                "application_id",
                "exactly one of application_id and employee_id is required",
            )]))
        }
    };

    let result = state.issuance.issue_certificate(draft).await?;
    let base_url = state.issuance.base_url();
    Ok((
        StatusCode::CREATED,
        Json(issued(result, |c| CertificateResponse::new(c, base_url))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/certificates",
    tag = "documents",
    responses((status = 200, description = "All certificates", body = [CertificateResponse]))
)]
pub async fn list_certificates(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<CertificateResponse>>> {
    let base_url = state.issuance.base_url();
    let certificates = state.db.list_certificates().await?;
    Ok(Json(
        certificates
            .into_iter()
            .map(|c| CertificateResponse::new(c, base_url))
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/certificates/{id}/download",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Certificate id")),
    responses(
        (status = 200, description = "The certificate PDF", content_type = "application/pdf"),
        (status = 403, description = "Not the recipient", body = ErrorBody),
        (status = 404, description = "No such certificate", body = ErrorBody)
    )
)]
pub async fn download_certificate(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let certificate = state
        .db
        .get_certificate(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Certificate {id}")))?;
    if !actor.is_admin() && certificate_owner(&state, &certificate).await? != Some(actor.user_id) {
        return Err(AppError::Forbidden);
    }

    let pdf = state
        .issuance
        .render(RenderableDocument::Certificate(&certificate))?;
    Ok(pdf_response(&certificate.certificate_number, pdf))
}

#[utoipa::path(
    patch,
    path = "/api/certificates/{id}/revoke",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Certificate id")),
    request_body = RevokeRequest,
    responses(
        (status = 200, description = "Certificate revoked", body = CertificateResponse),
        (status = 404, description = "No such certificate", body = ErrorBody),
        (status = 409, description = "Already revoked", body = ErrorBody)
    )
)]
pub async fn revoke_certificate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<RevokeRequest>,
) -> AppResult<Json<CertificateResponse>> {
    let certificate = state.issuance.revoke_certificate(id, &req.reason).await?;
    Ok(Json(CertificateResponse::new(
        certificate,
        state.issuance.base_url(),
    )))
}

//=========================================================================================
// Offer Letters
//=========================================================================================

#[utoipa::path(
    post,
    path = "/api/offer-letters",
    tag = "documents",
    request_body = IssueOfferLetterRequest,
    responses(
        (status = 201, description = "Offer letter issued", body = IssuedResponse<OfferLetterResponse>),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 404, description = "Application not found", body = ErrorBody),
        (status = 409, description = "Application not eligible or already has an offer", body = ErrorBody)
    )
)]
pub async fn issue_offer_letter(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<IssueOfferLetterRequest>,
) -> AppResult<impl IntoResponse> {
    let application = issuable_application(&state, req.application_id).await?;
    let program = match application.program_id {
        Some(program_id) => state.db.get_program(program_id).await?,
        None => None,
    };

    let details = OfferDetails {
        position: req.position,
        department: req.department.filter(|d| !d.trim().is_empty()),
        stipend: req.stipend,
        start_date: req.start_date,
        end_date: req.end_date,
    };
    let draft = offer_for_application(&application, program.as_ref(), details, Some(actor.user_id));

    let result = state.issuance.issue_offer_letter(draft).await?;
    let base_url = state.issuance.base_url();
    Ok((
        StatusCode::CREATED,
        Json(issued(result, |o| OfferLetterResponse::new(o, base_url))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/offer-letters",
    tag = "documents",
    responses((status = 200, description = "All offer letters", body = [OfferLetterResponse]))
)]
pub async fn list_offer_letters(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<OfferLetterResponse>>> {
    let base_url = state.issuance.base_url();
    let offers = state.db.list_offer_letters().await?;
    Ok(Json(
        offers
            .into_iter()
            .map(|o| OfferLetterResponse::new(o, base_url))
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/offer-letters/{id}/download",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Offer letter id")),
    responses(
        (status = 200, description = "The offer letter PDF", content_type = "application/pdf"),
        (status = 403, description = "Not the candidate", body = ErrorBody),
        (status = 404, description = "No such offer letter", body = ErrorBody)
    )
)]
pub async fn download_offer_letter(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let offer = state
        .db
        .get_offer_letter(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Offer letter {id}")))?;
    if !actor.can_access(offer.candidate_user_id) {
        return Err(AppError::Forbidden);
    }

    let pdf = state.issuance.render(RenderableDocument::OfferLetter(&offer))?;
    Ok(pdf_response(&offer.offer_number, pdf))
}

/// The candidate accepts or rejects their offer. An offer can be answered once.
#[utoipa::path(
    patch,
    path = "/api/offer-letters/{id}/respond",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Offer letter id")),
    request_body = RespondToOfferRequest,
    responses(
        (status = 200, description = "Answer recorded", body = OfferLetterResponse),
        (status = 403, description = "Not the candidate", body = ErrorBody),
        (status = 404, description = "No such offer letter", body = ErrorBody),
        (status = 409, description = "Already answered", body = ErrorBody)
    )
)]
pub async fn respond_to_offer_letter(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<RespondToOfferRequest>,
) -> AppResult<Json<OfferLetterResponse>> {
    let decision: OfferDecision = req.decision.trim().parse().map_err(
        |e: veridant_core::domain::ParseEnumError| {
            AppError::Validation(vec![FieldError::new("decision", e.to_string())])
        },
    )?;

    let offer = state
        .db
        .get_offer_letter(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Offer letter {id}")))?;
    if offer.candidate_user_id != Some(actor.user_id) {
        return Err(AppError::Forbidden);
    }

    let answered = state.issuance.respond_to_offer(id, decision).await?;
    Ok(Json(OfferLetterResponse::new(
        answered,
        state.issuance.base_url(),
    )))
}

//=========================================================================================
// College MoUs
//=========================================================================================

#[utoipa::path(
    post,
    path = "/api/mous",
    tag = "documents",
    request_body = IssueMouRequest,
    responses(
        (status = 201, description = "MoU issued", body = IssuedResponse<MouResponse>),
        (status = 400, description = "Invalid request", body = ErrorBody)
    )
)]
pub async fn issue_mou(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<IssueMouRequest>,
) -> AppResult<impl IntoResponse> {
    let draft = NewMou {
        college_name: req.college_name,
        college_address: req.college_address,
        college_signatory: req.college_signatory,
        college_email: req.college_email,
        company_signatory: req.company_signatory,
        purpose: req.purpose,
        start_date: req.start_date,
        end_date: req.end_date,
        issued_by: Some(actor.user_id),
    };

    let result = state.issuance.issue_mou(draft).await?;
    let base_url = state.issuance.base_url();
    Ok((
        StatusCode::CREATED,
        Json(issued(result, |m| MouResponse::new(m, base_url))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/mous",
    tag = "documents",
    responses((status = 200, description = "All MoUs", body = [MouResponse]))
)]
pub async fn list_mous(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<MouResponse>>> {
    let base_url = state.issuance.base_url();
    let mous = state.db.list_mous().await?;
    Ok(Json(
        mous.into_iter().map(|m| MouResponse::new(m, base_url)).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/mous/{id}/download",
    tag = "documents",
    params(("id" = Uuid, Path, description = "MoU id")),
    responses(
        (status = 200, description = "The MoU PDF", content_type = "application/pdf"),
        (status = 404, description = "No such MoU", body = ErrorBody)
    )
)]
pub async fn download_mou(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let mou = state
        .db
        .get_mou(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("MoU {id}")))?;
    let pdf = state.issuance.render(RenderableDocument::Mou(&mou))?;
    Ok(pdf_response(&mou.mou_number, pdf))
}

#[utoipa::path(
    patch,
    path = "/api/mous/{id}/revoke",
    tag = "documents",
    params(("id" = Uuid, Path, description = "MoU id")),
    request_body = RevokeRequest,
    responses(
        (status = 200, description = "MoU revoked", body = MouResponse),
        (status = 404, description = "No such MoU", body = ErrorBody),
        (status = 409, description = "Already revoked", body = ErrorBody)
    )
)]
pub async fn revoke_mou(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<RevokeRequest>,
) -> AppResult<Json<MouResponse>> {
    let mou = state.issuance.revoke_mou(id, &req.reason).await?;
    Ok(Json(MouResponse::new(mou, state.issuance.base_url())))
}
