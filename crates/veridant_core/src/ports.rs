//! crates/veridant_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases, PDF
//! libraries or mail providers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    ApplicationFilter, Certificate, CollegeMou, Contact, ContactStatus, Employee,
    InternshipApplication, Message, NewApplication, NewCertificate, NewContact, NewEmployee,
    NewMessage, NewMou, NewOfferLetter, NewProgram, NewReport, NewVerificationLog, OfferDecision,
    OfferLetter, Program, ProgramUpdate, Report, Role, StatusChange, StatusHistoryEntry, User,
    UserCredentials, VerificationLog,
};
use crate::lifecycle::ApplicationStatus;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, PDF).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The write conflicts with the current state (duplicate key, stale status, ...).
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Persistence Gateway
//=========================================================================================

/// Storage for every back-office entity.
///
/// Lookups return `Ok(None)` when nothing matches; updates on an unknown id
/// return `Ok(None)` as well. `create_*` for sequence-numbered kinds derive
/// the reference number (and the verification token, for documents) in the
/// same atomic step as the insert, so concurrent creates never share a number.
/// Status history and verification logs are append-only.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users & Auth ---
    async fn create_user(
        &self,
        email: &str,
        full_name: &str,
        hashed_password: &str,
        role: Role,
    ) -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<Option<User>>;

    async fn get_user_credentials(&self, email: &str) -> PortResult<Option<UserCredentials>>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the session's user if the session exists and has not expired.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Option<Uuid>>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Contacts ---
    async fn create_contact(&self, contact: NewContact) -> PortResult<Contact>;

    async fn list_contacts(&self) -> PortResult<Vec<Contact>>;

    async fn update_contact_status(
        &self,
        contact_id: Uuid,
        status: ContactStatus,
    ) -> PortResult<Option<Contact>>;

    async fn count_contacts(&self) -> PortResult<i64>;

    // --- Programs ---
    async fn create_program(&self, program: NewProgram) -> PortResult<Program>;

    async fn get_program(&self, program_id: Uuid) -> PortResult<Option<Program>>;

    async fn list_programs(&self, active_only: bool) -> PortResult<Vec<Program>>;

    async fn update_program(
        &self,
        program_id: Uuid,
        update: ProgramUpdate,
    ) -> PortResult<Option<Program>>;

    async fn count_programs(&self) -> PortResult<i64>;

    // --- Applications & Status History ---
    /// Inserts the application in `submitted` together with its initial
    /// history entry.
    async fn create_application(
        &self,
        application: NewApplication,
    ) -> PortResult<InternshipApplication>;

    async fn get_application(&self, application_id: Uuid)
        -> PortResult<Option<InternshipApplication>>;

    async fn get_application_by_number(
        &self,
        application_number: &str,
    ) -> PortResult<Option<InternshipApplication>>;

    async fn list_applications(
        &self,
        filter: ApplicationFilter,
    ) -> PortResult<Vec<InternshipApplication>>;

    /// Applies the change and appends one history entry, atomically. Fails
    /// with `Conflict` if the stored status is no longer `change.expected`.
    async fn update_application_status(
        &self,
        application_id: Uuid,
        change: StatusChange,
    ) -> PortResult<Option<InternshipApplication>>;

    /// History entries oldest first.
    async fn list_status_history(&self, application_id: Uuid)
        -> PortResult<Vec<StatusHistoryEntry>>;

    async fn count_applications(&self) -> PortResult<i64>;

    async fn count_applications_by_status(&self) -> PortResult<Vec<(ApplicationStatus, i64)>>;

    // --- Certificates ---
    async fn create_certificate(&self, certificate: NewCertificate) -> PortResult<Certificate>;

    async fn get_certificate(&self, certificate_id: Uuid) -> PortResult<Option<Certificate>>;

    async fn get_certificate_by_token(&self, token: &str) -> PortResult<Option<Certificate>>;

    async fn list_certificates(&self) -> PortResult<Vec<Certificate>>;

    /// One-way. Fails with `Conflict` if the certificate is already revoked.
    async fn revoke_certificate(
        &self,
        certificate_id: Uuid,
        reason: &str,
    ) -> PortResult<Option<Certificate>>;

    async fn count_certificates(&self) -> PortResult<i64>;

    // --- Offer Letters ---
    async fn create_offer_letter(&self, offer: NewOfferLetter) -> PortResult<OfferLetter>;

    async fn get_offer_letter(&self, offer_id: Uuid) -> PortResult<Option<OfferLetter>>;

    async fn get_offer_letter_by_token(&self, token: &str) -> PortResult<Option<OfferLetter>>;

    async fn list_offer_letters(&self) -> PortResult<Vec<OfferLetter>>;

    /// Records the decision once. Fails with `Conflict` if the offer is no
    /// longer pending.
    async fn respond_to_offer_letter(
        &self,
        offer_id: Uuid,
        decision: OfferDecision,
    ) -> PortResult<Option<OfferLetter>>;

    async fn count_offer_letters(&self) -> PortResult<i64>;

    // --- College MoUs ---
    async fn create_mou(&self, mou: NewMou) -> PortResult<CollegeMou>;

    async fn get_mou(&self, mou_id: Uuid) -> PortResult<Option<CollegeMou>>;

    async fn get_mou_by_token(&self, token: &str) -> PortResult<Option<CollegeMou>>;

    async fn list_mous(&self) -> PortResult<Vec<CollegeMou>>;

    async fn revoke_mou(&self, mou_id: Uuid, reason: &str) -> PortResult<Option<CollegeMou>>;

    async fn count_mous(&self) -> PortResult<i64>;

    // --- Employees ---
    async fn create_employee(&self, employee: NewEmployee) -> PortResult<Employee>;

    async fn get_employee(&self, employee_id: Uuid) -> PortResult<Option<Employee>>;

    async fn list_employees(&self) -> PortResult<Vec<Employee>>;

    async fn count_employees(&self) -> PortResult<i64>;

    // --- Messages ---
    async fn create_message(&self, message: NewMessage) -> PortResult<Message>;

    /// Messages sent to or by the user, newest first.
    async fn list_messages_for_user(&self, user_id: Uuid) -> PortResult<Vec<Message>>;

    /// Marks a message read if `recipient_id` is its recipient.
    async fn mark_message_read(
        &self,
        message_id: Uuid,
        recipient_id: Uuid,
    ) -> PortResult<Option<Message>>;

    // --- Reports ---
    async fn create_report(&self, report: NewReport) -> PortResult<Report>;

    async fn list_reports_for_application(&self, application_id: Uuid) -> PortResult<Vec<Report>>;

    async fn review_report(
        &self,
        report_id: Uuid,
        reviewer_id: Uuid,
        feedback: &str,
    ) -> PortResult<Option<Report>>;

    // --- Verification Audit ---
    async fn append_verification_log(&self, log: NewVerificationLog)
        -> PortResult<VerificationLog>;

    /// Newest first, at most `limit` entries.
    async fn list_verification_logs(&self, limit: i64) -> PortResult<Vec<VerificationLog>>;
}

//=========================================================================================
// External Collaborators
//=========================================================================================

/// A persisted document handed to the renderer.
#[derive(Debug, Clone, Copy)]
pub enum RenderableDocument<'a> {
    Certificate(&'a Certificate),
    OfferLetter(&'a OfferLetter),
    Mou(&'a CollegeMou),
}

impl RenderableDocument<'_> {
    pub fn reference_number(&self) -> &str {
        match self {
            RenderableDocument::Certificate(c) => &c.certificate_number,
            RenderableDocument::OfferLetter(o) => &o.offer_number,
            RenderableDocument::Mou(m) => &m.mou_number,
        }
    }

    pub fn verification_token(&self) -> &str {
        match self {
            RenderableDocument::Certificate(c) => &c.verification_token,
            RenderableDocument::OfferLetter(o) => &o.verification_token,
            RenderableDocument::Mou(m) => &m.verification_token,
        }
    }

    /// The URL encoded in the document's QR code.
    pub fn verification_url(&self, base_url: &str) -> String {
        format!(
            "{}/verify/{}",
            base_url.trim_end_matches('/'),
            self.verification_token()
        )
    }
}

pub trait DocumentRenderer: Send + Sync {
    /// Renders a PDF for `document`. Output depends only on the inputs and the
    /// current time (printed as the "generated on" line).
    fn render(&self, document: RenderableDocument<'_>, base_url: &str) -> PortResult<Vec<u8>>;
}

/// The templated emails the back office sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    ApplicationReceived,
    ApplicationStatusChanged,
    CertificateIssued,
    OfferLetterIssued,
    MouIssued,
    ContactAcknowledgement,
}

impl EmailKind {
    pub fn template_name(&self) -> &'static str {
        match self {
            EmailKind::ApplicationReceived => "application_received",
            EmailKind::ApplicationStatusChanged => "application_status_changed",
            EmailKind::CertificateIssued => "certificate_issued",
            EmailKind::OfferLetterIssued => "offer_letter_issued",
            EmailKind::MouIssued => "mou_issued",
            EmailKind::ContactAcknowledgement => "contact_acknowledgement",
        }
    }
}

#[async_trait]
pub trait EmailService: Send + Sync {
    /// Sends one templated email. Returns `false` if delivery failed; email is
    /// best effort and never fails the surrounding operation.
    async fn send_templated_email(
        &self,
        kind: EmailKind,
        recipient: &str,
        variables: &[(&str, String)],
    ) -> bool;
}

/// Sends a templated email and logs when it was not delivered.
pub async fn notify(
    email: &dyn EmailService,
    kind: EmailKind,
    recipient: &str,
    variables: &[(&str, String)],
) -> bool {
    let sent = email.send_templated_email(kind, recipient, variables).await;
    if !sent {
        tracing::warn!(
            template = kind.template_name(),
            to = recipient,
            "Email not sent"
        );
    }
    sent
}
