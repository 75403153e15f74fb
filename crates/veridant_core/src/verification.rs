//! crates/veridant_core/src/verification.rs
//!
//! Public verification of issued documents by token.
//!
//! Every attempt is written to the verification log, found or not. The
//! document itself is never touched. The public view carries only what is
//! printed on the document; an unknown token and a malformed one produce the
//! same answer.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use crate::domain::{
    Certificate, CertificateStatus, CollegeMou, DocumentKind, MouStatus, NewVerificationLog,
    OfferLetter, VerificationResult, UNKNOWN_DOCUMENT_ID,
};
use crate::error::ServiceResult;
use crate::identifiers::{is_well_formed_token, TOKEN_LENGTH};
use crate::ports::DatabaseService;

pub const NOT_FOUND_MESSAGE: &str =
    "Document not found. Please check the verification code and try again.";

/// Who asked. Both fields come from the HTTP request and may be absent.
#[derive(Debug, Clone, Default)]
pub struct Requester {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublicCertificate {
    pub certificate_number: String,
    pub recipient_name: String,
    pub program_title: String,
    pub certificate_type: String,
    pub issue_date: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub grade: Option<String>,
    pub mentor_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublicOfferLetter {
    pub offer_number: String,
    pub candidate_name: String,
    pub position: String,
    pub department: String,
    pub start_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublicMou {
    pub mou_number: String,
    pub college_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PublicDocument {
    Certificate(PublicCertificate),
    OfferLetter(PublicOfferLetter),
    Mou(PublicMou),
}

/// The redacted answer given to the public.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    Valid(PublicDocument),
    Revoked { reason: Option<String> },
    Invalid,
}

impl VerificationOutcome {
    pub fn result(&self) -> VerificationResult {
        match self {
            VerificationOutcome::Valid(_) => VerificationResult::Valid,
            VerificationOutcome::Revoked { .. } => VerificationResult::Revoked,
            VerificationOutcome::Invalid => VerificationResult::Invalid,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationOutcome::Valid(_))
    }
}

impl From<&Certificate> for PublicCertificate {
    fn from(c: &Certificate) -> Self {
        Self {
            certificate_number: c.certificate_number.clone(),
            recipient_name: c.recipient_name.clone(),
            program_title: c.program_title.clone(),
            certificate_type: c.certificate_type.clone(),
            issue_date: c.issue_date,
            valid_until: c.valid_until,
            grade: c.grade.clone(),
            mentor_name: c.mentor_name.clone(),
        }
    }
}

impl From<&OfferLetter> for PublicOfferLetter {
    fn from(o: &OfferLetter) -> Self {
        Self {
            offer_number: o.offer_number.clone(),
            candidate_name: o.candidate_name.clone(),
            position: o.position.clone(),
            department: o.department.clone(),
            start_date: o.start_date,
        }
    }
}

impl From<&CollegeMou> for PublicMou {
    fn from(m: &CollegeMou) -> Self {
        Self {
            mou_number: m.mou_number.clone(),
            college_name: m.college_name.clone(),
            start_date: m.start_date,
            end_date: m.end_date,
        }
    }
}

#[derive(Clone)]
pub struct VerificationService {
    db: Arc<dyn DatabaseService>,
}

impl VerificationService {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    pub async fn verify(
        &self,
        kind: DocumentKind,
        token: &str,
        requester: Requester,
    ) -> ServiceResult<VerificationOutcome> {
        // Anything past the token length cannot match, and is not logged.
        let token: String = token.trim().chars().take(TOKEN_LENGTH + 1).collect();
        let token = token.to_uppercase();
        let (document_id, outcome) = if is_well_formed_token(&token) {
            self.lookup(kind, &token).await?
        } else {
            (None, VerificationOutcome::Invalid)
        };

        let result = outcome.result();
        self.db
            .append_verification_log(NewVerificationLog {
                document_kind: kind,
                document_id: document_id.unwrap_or_else(|| UNKNOWN_DOCUMENT_ID.to_string()),
                token: token.chars().take(TOKEN_LENGTH).collect(),
                requester_ip: requester.ip,
                user_agent: requester.user_agent,
                result,
            })
            .await?;
        info!(%kind, %result, "Verification attempt recorded");

        Ok(outcome)
    }

    async fn lookup(
        &self,
        kind: DocumentKind,
        token: &str,
    ) -> ServiceResult<(Option<String>, VerificationOutcome)> {
        let found = match kind {
            DocumentKind::Certificate => self.db.get_certificate_by_token(token).await?.map(|c| {
                let outcome = match c.status {
                    CertificateStatus::Issued => {
                        VerificationOutcome::Valid(PublicDocument::Certificate((&c).into()))
                    }
                    CertificateStatus::Revoked => VerificationOutcome::Revoked {
                        reason: c.revoked_reason.clone(),
                    },
                };
                (c.id, outcome)
            }),
            DocumentKind::OfferLetter => {
                self.db.get_offer_letter_by_token(token).await?.map(|o| {
                    let public = PublicDocument::OfferLetter((&o).into());
                    (o.id, VerificationOutcome::Valid(public))
                })
            }
            DocumentKind::Mou => self.db.get_mou_by_token(token).await?.map(|m| {
                let outcome = match m.status {
                    MouStatus::Active => {
                        VerificationOutcome::Valid(PublicDocument::Mou((&m).into()))
                    }
                    MouStatus::Revoked => VerificationOutcome::Revoked {
                        reason: m.revoked_reason.clone(),
                    },
                };
                (m.id, outcome)
            }),
        };

        Ok(match found {
            Some((id, outcome)) => (Some(id.to_string()), outcome),
            None => (None, VerificationOutcome::Invalid),
        })
    }
}
