//! services/api/src/web/verify.rs
//!
//! Public verification of certificates, offer letters and MoUs by the token
//! printed in their QR code. Always answers 200 with a structured body; the
//! audit log entry is written by the core service.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use veridant_core::domain::DocumentKind;
use veridant_core::verification::{PublicDocument, NOT_FOUND_MESSAGE};
use veridant_core::VerificationOutcome;

use crate::error::AppResult;
use crate::web::middleware::ClientInfo;
use crate::web::state::AppState;

//=========================================================================================
// Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct PublicCertificateBody {
    pub certificate_number: String,
    pub recipient_name: String,
    pub program_title: String,
    pub certificate_type: String,
    pub issue_date: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub grade: Option<String>,
    pub mentor_name: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PublicOfferLetterBody {
    pub offer_number: String,
    pub candidate_name: String,
    pub position: String,
    pub department: String,
    pub start_date: NaiveDate,
}

#[derive(Serialize, ToSchema)]
pub struct PublicMouBody {
    pub mou_number: String,
    pub college_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Serialize, ToSchema)]
#[serde(untagged)]
pub enum PublicDocumentBody {
    Certificate(PublicCertificateBody),
    OfferLetter(PublicOfferLetterBody),
    Mou(PublicMouBody),
}

impl From<PublicDocument> for PublicDocumentBody {
    fn from(document: PublicDocument) -> Self {
        match document {
            PublicDocument::Certificate(c) => {
                PublicDocumentBody::Certificate(PublicCertificateBody {
                    certificate_number: c.certificate_number,
                    recipient_name: c.recipient_name,
                    program_title: c.program_title,
                    certificate_type: c.certificate_type,
                    issue_date: c.issue_date,
                    valid_until: c.valid_until,
                    grade: c.grade,
                    mentor_name: c.mentor_name,
                })
            }
            PublicDocument::OfferLetter(o) => {
                PublicDocumentBody::OfferLetter(PublicOfferLetterBody {
                    offer_number: o.offer_number,
                    candidate_name: o.candidate_name,
                    position: o.position,
                    department: o.department,
                    start_date: o.start_date,
                })
            }
            PublicDocument::Mou(m) => PublicDocumentBody::Mou(PublicMouBody {
                mou_number: m.mou_number,
                college_name: m.college_name,
                start_date: m.start_date,
                end_date: m.end_date,
            }),
        }
    }
}

/// The public answer. Revoked and unknown documents expose nothing but the
/// status (and the revocation reason).
#[derive(Serialize, ToSchema)]
pub struct VerificationResponse {
    pub valid: bool,
    /// `valid`, `revoked` or `invalid`.
    pub status: String,
    pub document_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<PublicDocumentBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VerificationResponse {
    fn new(kind: DocumentKind, outcome: VerificationOutcome) -> Self {
        let status = outcome.result().to_string();
        let document_type = kind.to_string();
        match outcome {
            VerificationOutcome::Valid(document) => Self {
                valid: true,
                status,
                document_type,
                document: Some(document.into()),
                revoked_reason: None,
                message: None,
            },
            VerificationOutcome::Revoked { reason } => Self {
                valid: false,
                status,
                document_type,
                document: None,
                revoked_reason: reason,
                message: Some("This document has been revoked.".to_string()),
            },
            VerificationOutcome::Invalid => Self {
                valid: false,
                status,
                document_type,
                document: None,
                revoked_reason: None,
                message: Some(NOT_FOUND_MESSAGE.to_string()),
            },
        }
    }
}

async fn verify(
    state: &AppState,
    kind: DocumentKind,
    token: &str,
    client: ClientInfo,
) -> AppResult<Json<VerificationResponse>> {
    let outcome = state.verification.verify(kind, token, client.0).await?;
    Ok(Json(VerificationResponse::new(kind, outcome)))
}

//=========================================================================================
// Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/api/verify/certificate/{token}",
    tag = "verification",
    params(("token" = String, Path, description = "Verification token from the QR code")),
    responses((status = 200, description = "Verification result", body = VerificationResponse))
)]
pub async fn verify_certificate(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    Path(token): Path<String>,
) -> AppResult<Json<VerificationResponse>> {
    verify(&state, DocumentKind::Certificate, &token, client).await
}

#[utoipa::path(
    get,
    path = "/api/verify/offer/{token}",
    tag = "verification",
    params(("token" = String, Path, description = "Verification token from the QR code")),
    responses((status = 200, description = "Verification result", body = VerificationResponse))
)]
pub async fn verify_offer_letter(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    Path(token): Path<String>,
) -> AppResult<Json<VerificationResponse>> {
    verify(&state, DocumentKind::OfferLetter, &token, client).await
}

#[utoipa::path(
    get,
    path = "/api/verify/mou/{token}",
    tag = "verification",
    params(("token" = String, Path, description = "Verification token from the QR code")),
    responses((status = 200, description = "Verification result", body = VerificationResponse))
)]
pub async fn verify_mou(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    Path(token): Path<String>,
) -> AppResult<Json<VerificationResponse>> {
    verify(&state, DocumentKind::Mou, &token, client).await
}
