//! crates/veridant_core/src/issuance.rs
//!
//! Issues certificates, offer letters and college MoUs and renders them.
//!
//! The reference number and verification token are assigned by the store in
//! the same atomic step as the insert. Rendering happens afterwards; a render
//! failure leaves the persisted record in place and the artifact can be
//! produced again from the record at any time.
//!
//! The "application must be selected or completed" rule is checked by the
//! caller before a draft is built, not here.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    Certificate, CollegeMou, Employee, InternshipApplication, NewCertificate, NewMou,
    NewOfferLetter, OfferDecision, OfferLetter, Program,
};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::{
    notify, DatabaseService, DocumentRenderer, EmailKind, EmailService, PortError,
    RenderableDocument,
};
use crate::validation::{validate_certificate, validate_mou, validate_offer_letter, Validator};

/// A persisted document and, if rendering succeeded, its PDF.
#[derive(Debug, Clone)]
pub struct Issued<T> {
    pub record: T,
    pub artifact: Option<Vec<u8>>,
}

/// Admin-supplied certificate fields not taken from the recipient's record.
#[derive(Debug, Clone, Default)]
pub struct CertificateDetails {
    pub certificate_type: Option<String>,
    pub program_title: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub grade: Option<String>,
    pub mentor_name: Option<String>,
}

const DEFAULT_CERTIFICATE_TYPE: &str = "internship_completion";

/// Builds a certificate draft for an intern.
pub fn certificate_for_application(
    application: &InternshipApplication,
    program: Option<&Program>,
    details: CertificateDetails,
    issued_by: Option<Uuid>,
) -> NewCertificate {
    NewCertificate {
        application_id: Some(application.id),
        employee_id: None,
        recipient_name: application.full_name.clone(),
        recipient_email: Some(application.email.clone()),
        program_title: details
            .program_title
            .or_else(|| program.map(|p| p.title.clone()))
            .unwrap_or_default(),
        certificate_type: details
            .certificate_type
            .unwrap_or_else(|| DEFAULT_CERTIFICATE_TYPE.to_string()),
        issue_date: details.issue_date.unwrap_or_else(|| Utc::now().date_naive()),
        valid_until: details.valid_until,
        grade: details.grade,
        mentor_name: details.mentor_name,
        issued_by,
    }
}

/// Builds a certificate draft for an employee (experience, appreciation, ...).
pub fn certificate_for_employee(
    employee: &Employee,
    details: CertificateDetails,
    issued_by: Option<Uuid>,
) -> NewCertificate {
    NewCertificate {
        application_id: None,
        employee_id: Some(employee.id),
        recipient_name: employee.full_name.clone(),
        recipient_email: Some(employee.email.clone()),
        program_title: details
            .program_title
            .unwrap_or_else(|| employee.designation.clone()),
        certificate_type: details
            .certificate_type
            .unwrap_or_else(|| "experience".to_string()),
        issue_date: details.issue_date.unwrap_or_else(|| Utc::now().date_naive()),
        valid_until: details.valid_until,
        grade: details.grade,
        mentor_name: details.mentor_name,
        issued_by,
    }
}

/// Admin-supplied offer terms.
#[derive(Debug, Clone)]
pub struct OfferDetails {
    pub position: String,
    pub department: Option<String>,
    pub stipend: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Builds an offer letter draft for an applicant.
pub fn offer_for_application(
    application: &InternshipApplication,
    program: Option<&Program>,
    details: OfferDetails,
    issued_by: Option<Uuid>,
) -> NewOfferLetter {
    NewOfferLetter {
        application_id: Some(application.id),
        candidate_user_id: application.user_id,
        candidate_name: application.full_name.clone(),
        candidate_email: application.email.clone(),
        position: details.position,
        department: details
            .department
            .or_else(|| program.map(|p| p.department.clone()))
            .unwrap_or_default(),
        stipend: details.stipend.or_else(|| program.and_then(|p| p.stipend)),
        start_date: details.start_date,
        end_date: details.end_date,
        issued_by,
    }
}

#[derive(Clone)]
pub struct IssuanceService {
    db: Arc<dyn DatabaseService>,
    renderer: Arc<dyn DocumentRenderer>,
    email: Arc<dyn EmailService>,
    base_url: String,
}

impl IssuanceService {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        renderer: Arc<dyn DocumentRenderer>,
        email: Arc<dyn EmailService>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            db,
            renderer,
            email,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    //=====================================================================================
    // Issuance
    //=====================================================================================

    /// Issues a certificate. An application holds at most one.
    pub async fn issue_certificate(
        &self,
        draft: NewCertificate,
    ) -> ServiceResult<Issued<Certificate>> {
        validate_certificate(&draft)?;
        let record = self
            .db
            .create_certificate(draft)
            .await
            .map_err(|e| already_issued(e, "a certificate"))?;
        info!(
            certificate_number = %record.certificate_number,
            recipient = %record.recipient_name,
            "Certificate issued"
        );

        let document = RenderableDocument::Certificate(&record);
        let artifact = self.try_render(document);

        if let Some(email) = &record.recipient_email {
            notify(
                self.email.as_ref(),
                EmailKind::CertificateIssued,
                email,
                &[
                    ("name", record.recipient_name.clone()),
                    ("certificate_number", record.certificate_number.clone()),
                    ("program_title", record.program_title.clone()),
                    ("verification_url", document.verification_url(&self.base_url)),
                ],
            )
            .await;
        }

        Ok(Issued { record, artifact })
    }

    /// Issues an offer letter. An application holds at most one.
    pub async fn issue_offer_letter(
        &self,
        draft: NewOfferLetter,
    ) -> ServiceResult<Issued<OfferLetter>> {
        validate_offer_letter(&draft)?;
        let record = self
            .db
            .create_offer_letter(draft)
            .await
            .map_err(|e| already_issued(e, "an offer letter"))?;
        info!(
            offer_number = %record.offer_number,
            candidate = %record.candidate_name,
            "Offer letter issued"
        );

        let document = RenderableDocument::OfferLetter(&record);
        let artifact = self.try_render(document);

        notify(
            self.email.as_ref(),
            EmailKind::OfferLetterIssued,
            &record.candidate_email,
            &[
                ("name", record.candidate_name.clone()),
                ("offer_number", record.offer_number.clone()),
                ("position", record.position.clone()),
                ("start_date", record.start_date.to_string()),
                ("verification_url", document.verification_url(&self.base_url)),
            ],
        )
        .await;

        Ok(Issued { record, artifact })
    }

    pub async fn issue_mou(&self, draft: NewMou) -> ServiceResult<Issued<CollegeMou>> {
        validate_mou(&draft)?;
        let record = self.db.create_mou(draft).await?;
        info!(mou_number = %record.mou_number, college = %record.college_name, "MoU issued");

        let document = RenderableDocument::Mou(&record);
        let artifact = self.try_render(document);

        if let Some(email) = &record.college_email {
            notify(
                self.email.as_ref(),
                EmailKind::MouIssued,
                email,
                &[
                    ("college_name", record.college_name.clone()),
                    ("mou_number", record.mou_number.clone()),
                    ("start_date", record.start_date.to_string()),
                    ("end_date", record.end_date.to_string()),
                    ("verification_url", document.verification_url(&self.base_url)),
                ],
            )
            .await;
        }

        Ok(Issued { record, artifact })
    }

    //=====================================================================================
    // Rendering
    //=====================================================================================

    /// Renders a persisted document again, for downloads and after a failed
    /// render at issuance.
    pub fn render(&self, document: RenderableDocument<'_>) -> ServiceResult<Vec<u8>> {
        Ok(self.renderer.render(document, &self.base_url)?)
    }

    fn try_render(&self, document: RenderableDocument<'_>) -> Option<Vec<u8>> {
        match self.renderer.render(document, &self.base_url) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(
                    reference = document.reference_number(),
                    error = %e,
                    "Document persisted but rendering failed; it can be downloaded later"
                );
                None
            }
        }
    }

    //=====================================================================================
    // Post-issuance Changes
    //=====================================================================================

    /// Revokes a certificate for good.
    pub async fn revoke_certificate(
        &self,
        certificate_id: Uuid,
        reason: &str,
    ) -> ServiceResult<Certificate> {
        Validator::new().required("reason", reason).finish()?;
        match self.db.revoke_certificate(certificate_id, reason.trim()).await {
            Ok(Some(certificate)) => {
                info!(certificate_number = %certificate.certificate_number, "Certificate revoked");
                Ok(certificate)
            }
            Ok(None) => Err(ServiceError::NotFound(format!("Certificate {certificate_id}"))),
            Err(PortError::Conflict(_)) => Err(ServiceError::Conflict(
                "Certificate is already revoked".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn revoke_mou(&self, mou_id: Uuid, reason: &str) -> ServiceResult<CollegeMou> {
        Validator::new().required("reason", reason).finish()?;
        match self.db.revoke_mou(mou_id, reason.trim()).await {
            Ok(Some(mou)) => {
                info!(mou_number = %mou.mou_number, "MoU revoked");
                Ok(mou)
            }
            Ok(None) => Err(ServiceError::NotFound(format!("MoU {mou_id}"))),
            Err(PortError::Conflict(_)) => {
                Err(ServiceError::Conflict("MoU is already revoked".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Records the candidate's answer. An offer can be answered only once.
    pub async fn respond_to_offer(
        &self,
        offer_id: Uuid,
        decision: OfferDecision,
    ) -> ServiceResult<OfferLetter> {
        match self.db.respond_to_offer_letter(offer_id, decision).await {
            Ok(Some(offer)) => {
                info!(
                    offer_number = %offer.offer_number,
                    status = %offer.status,
                    "Offer letter answered"
                );
                Ok(offer)
            }
            Ok(None) => Err(ServiceError::NotFound(format!("Offer letter {offer_id}"))),
            Err(PortError::Conflict(_)) => Err(ServiceError::Conflict(
                "Offer letter has already been answered".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

/// A store conflict on create means the application already holds one.
fn already_issued(e: PortError, what: &str) -> ServiceError {
    match e {
        PortError::Conflict(_) => {
            ServiceError::Conflict(format!("The application already has {what}"))
        }
        other => other.into(),
    }
}
