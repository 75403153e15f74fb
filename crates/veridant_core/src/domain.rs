//! crates/veridant_core/src/domain.rs
//!
//! Defines the pure, core data structures for the back office.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::lifecycle::ApplicationStatus;

/// Sentinel written to a verification log when a token matches no document.
pub const UNKNOWN_DOCUMENT_ID: &str = "unknown";

//=========================================================================================
// Text-backed Enums
//=========================================================================================

/// Returned when a stored or submitted string is not a known enum value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {kind}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a fieldless enum that round-trips through its snake_case text form.
#[macro_export]
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident as $label:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::domain::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::domain::ParseEnumError {
                        kind: $label,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

text_enum! {
    /// Gates admin-only operations.
    pub enum Role as "role" {
        Admin => "admin",
        Candidate => "candidate",
    }
}

text_enum! {
    pub enum ContactStatus as "contact status" {
        New => "new",
        Read => "read",
        Replied => "replied",
    }
}

text_enum! {
    pub enum CertificateStatus as "certificate status" {
        Issued => "issued",
        Revoked => "revoked",
    }
}

text_enum! {
    pub enum OfferStatus as "offer status" {
        Pending => "pending",
        Accepted => "accepted",
        Rejected => "rejected",
    }
}

text_enum! {
    pub enum MouStatus as "MoU status" {
        Active => "active",
        Revoked => "revoked",
    }
}

text_enum! {
    pub enum ReportStatus as "report status" {
        Submitted => "submitted",
        Reviewed => "reviewed",
    }
}

text_enum! {
    /// The kinds of documents that carry a public verification token.
    pub enum DocumentKind as "document kind" {
        Certificate => "certificate",
        OfferLetter => "offer_letter",
        Mou => "mou",
    }
}

text_enum! {
    pub enum VerificationResult as "verification result" {
        Valid => "valid",
        Invalid => "invalid",
        Revoked => "revoked",
    }
}

text_enum! {
    /// A candidate's answer to an offer letter.
    pub enum OfferDecision as "offer decision" {
        Accept => "accept",
        Reject => "reject",
    }
}

impl OfferDecision {
    pub fn resulting_status(&self) -> OfferStatus {
        match self {
            OfferDecision::Accept => OfferStatus::Accepted,
            OfferDecision::Reject => OfferStatus::Rejected,
        }
    }
}

//=========================================================================================
// Users and Auth
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub role: Role,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins can act on anything; everyone else only on what they own.
    pub fn can_access(&self, owner: Option<Uuid>) -> bool {
        self.is_admin() || owner == Some(self.user_id)
    }
}

//=========================================================================================
// Contacts and Programs
//=========================================================================================

/// A public contact-form submission.
#[derive(Debug, Clone)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
}

/// An internship program open for applications.
#[derive(Debug, Clone)]
pub struct Program {
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

#[derive(Debug, Clone)]
pub struct NewProgram {
    pub title: String,
    pub description: String,
    pub department: String,
    pub duration_weeks: i32,
    pub stipend: Option<i64>,
    pub location: Option<String>,
}

/// A partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProgramUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub department: Option<String>,
    pub duration_weeks: Option<i32>,
    pub stipend: Option<i64>,
    pub location: Option<String>,
    pub is_active: Option<bool>,
}

impl ProgramUpdate {
    pub fn apply(self, program: &mut Program) {
        if let Some(title) = self.title {
            program.title = title;
        }
        if let Some(description) = self.description {
            program.description = description;
        }
        if let Some(department) = self.department {
            program.department = department;
        }
        if let Some(weeks) = self.duration_weeks {
            program.duration_weeks = weeks;
        }
        if self.stipend.is_some() {
            program.stipend = self.stipend;
        }
        if self.location.is_some() {
            program.location = self.location;
        }
        if let Some(active) = self.is_active {
            program.is_active = active;
        }
    }
}

//=========================================================================================
// Internship Applications
//=========================================================================================

/// An internship application. Created in `submitted`, mutated only through
/// status transitions, never deleted.
#[derive(Debug, Clone)]
pub struct InternshipApplication {
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
    pub status: ApplicationStatus,
    pub status_notes: Option<String>,
    pub interview_at: Option<DateTime<Utc>>,
    pub interview_mode: Option<String>,
    pub interview_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The applicant-supplied part of an application.
#[derive(Debug, Clone, Default)]
pub struct NewApplication {
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
}

impl NewApplication {
    /// Builds the persisted record. Every application starts in `submitted`.
    pub fn into_record(
        self,
        id: Uuid,
        application_number: String,
        now: DateTime<Utc>,
    ) -> InternshipApplication {
        InternshipApplication {
            id,
            application_number,
            user_id: self.user_id,
            program_id: self.program_id,
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            date_of_birth: self.date_of_birth,
            college_name: self.college_name,
            degree: self.degree,
            branch: self.branch,
            graduation_year: self.graduation_year,
            cgpa: self.cgpa,
            resume_url: self.resume_url,
            id_proof_url: self.id_proof_url,
            marksheet_url: self.marksheet_url,
            cover_letter: self.cover_letter,
            status: ApplicationStatus::Submitted,
            status_notes: None,
            interview_at: None,
            interview_mode: None,
            interview_link: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Filters for listing applications. `None` matches everything.
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    pub program_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

impl ApplicationFilter {
    pub fn matches(&self, application: &InternshipApplication) -> bool {
        self.status.is_none_or(|s| application.status == s)
            && self.program_id.is_none_or(|p| application.program_id == Some(p))
            && self.user_id.is_none_or(|u| application.user_id == Some(u))
    }
}

/// A status change applied by an admin. `expected` is the status the caller
/// validated against; the store refuses the write if it no longer matches.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub expected: ApplicationStatus,
    pub status: ApplicationStatus,
    pub changed_by: Option<Uuid>,
    pub notes: Option<String>,
    pub interview_at: Option<DateTime<Utc>>,
    pub interview_mode: Option<String>,
    pub interview_link: Option<String>,
}

impl StatusChange {
    pub fn apply(&self, application: &mut InternshipApplication, now: DateTime<Utc>) {
        application.status = self.status;
        if self.notes.is_some() {
            application.status_notes = self.notes.clone();
        }
        if self.interview_at.is_some() {
            application.interview_at = self.interview_at;
        }
        if self.interview_mode.is_some() {
            application.interview_mode = self.interview_mode.clone();
        }
        if self.interview_link.is_some() {
            application.interview_link = self.interview_link.clone();
        }
        application.updated_at = now;
    }

    pub fn history_entry(&self, application_id: Uuid, now: DateTime<Utc>) -> StatusHistoryEntry {
        StatusHistoryEntry {
            id: Uuid::new_v4(),
            application_id,
            previous_status: Some(self.expected),
            new_status: self.status,
            changed_by: self.changed_by,
            notes: self.notes.clone(),
            created_at: now,
        }
    }
}

/// One append-only audit record of a status transition.
#[derive(Debug, Clone)]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub application_id: Uuid,
    /// `None` only for the entry written when the application is created.
    pub previous_status: Option<ApplicationStatus>,
    pub new_status: ApplicationStatus,
    pub changed_by: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StatusHistoryEntry {
    pub fn initial(application: &InternshipApplication) -> Self {
        Self {
            id: Uuid::new_v4(),
            application_id: application.id,
            previous_status: None,
            new_status: ApplicationStatus::Submitted,
            changed_by: application.user_id,
            notes: Some("Application submitted".to_string()),
            created_at: application.created_at,
        }
    }
}

//=========================================================================================
// Issued Documents
//=========================================================================================

#[derive(Debug, Clone)]
pub struct Certificate {
    pub id: Uuid,
    pub certificate_number: String,
    pub verification_token: String,
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
    pub status: CertificateStatus,
    pub revoked_reason: Option<String>,
    pub issued_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCertificate {
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
    pub issued_by: Option<Uuid>,
}

impl NewCertificate {
    pub fn into_record(
        self,
        id: Uuid,
        certificate_number: String,
        verification_token: String,
        now: DateTime<Utc>,
    ) -> Certificate {
        Certificate {
            id,
            certificate_number,
            verification_token,
            application_id: self.application_id,
            employee_id: self.employee_id,
            recipient_name: self.recipient_name,
            recipient_email: self.recipient_email,
            program_title: self.program_title,
            certificate_type: self.certificate_type,
            issue_date: self.issue_date,
            valid_until: self.valid_until,
            grade: self.grade,
            mentor_name: self.mentor_name,
            status: CertificateStatus::Issued,
            revoked_reason: None,
            issued_by: self.issued_by,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OfferLetter {
    pub id: Uuid,
    pub offer_number: String,
    pub verification_token: String,
    pub application_id: Option<Uuid>,
    pub candidate_user_id: Option<Uuid>,
    pub candidate_name: String,
    pub candidate_email: String,
    pub position: String,
    pub department: String,
    pub stipend: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: OfferStatus,
    pub accepted_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub issued_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOfferLetter {
    pub application_id: Option<Uuid>,
    pub candidate_user_id: Option<Uuid>,
    pub candidate_name: String,
    pub candidate_email: String,
    pub position: String,
    pub department: String,
    pub stipend: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub issued_by: Option<Uuid>,
}

impl NewOfferLetter {
    pub fn into_record(
        self,
        id: Uuid,
        offer_number: String,
        verification_token: String,
        now: DateTime<Utc>,
    ) -> OfferLetter {
        OfferLetter {
            id,
            offer_number,
            verification_token,
            application_id: self.application_id,
            candidate_user_id: self.candidate_user_id,
            candidate_name: self.candidate_name,
            candidate_email: self.candidate_email,
            position: self.position,
            department: self.department,
            stipend: self.stipend,
            start_date: self.start_date,
            end_date: self.end_date,
            status: OfferStatus::Pending,
            accepted_at: None,
            rejected_at: None,
            issued_by: self.issued_by,
            created_at: now,
        }
    }
}

impl OfferLetter {
    /// Records the candidate's decision. Only a pending offer can be answered.
    pub fn respond(&mut self, decision: OfferDecision, now: DateTime<Utc>) -> bool {
        if self.status != OfferStatus::Pending {
            return false;
        }
        self.status = decision.resulting_status();
        match decision {
            OfferDecision::Accept => self.accepted_at = Some(now),
            OfferDecision::Reject => self.rejected_at = Some(now),
        }
        true
    }
}

/// A partnership agreement with a college.
#[derive(Debug, Clone)]
pub struct CollegeMou {
    pub id: Uuid,
    pub mou_number: String,
    pub verification_token: String,
    pub college_name: String,
    pub college_address: String,
    pub college_signatory: String,
    pub college_email: Option<String>,
    pub company_signatory: String,
    pub purpose: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: MouStatus,
    pub revoked_reason: Option<String>,
    pub issued_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMou {
    pub college_name: String,
    pub college_address: String,
    pub college_signatory: String,
    /// Where the signed copy and verification link are sent, if known.
    pub college_email: Option<String>,
    pub company_signatory: String,
    pub purpose: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub issued_by: Option<Uuid>,
}

impl NewMou {
    pub fn into_record(
        self,
        id: Uuid,
        mou_number: String,
        verification_token: String,
        now: DateTime<Utc>,
    ) -> CollegeMou {
        CollegeMou {
            id,
            mou_number,
            verification_token,
            college_name: self.college_name,
            college_address: self.college_address,
            college_signatory: self.college_signatory,
            college_email: self.college_email,
            company_signatory: self.company_signatory,
            purpose: self.purpose,
            start_date: self.start_date,
            end_date: self.end_date,
            status: MouStatus::Active,
            revoked_reason: None,
            issued_by: self.issued_by,
            created_at: now,
        }
    }
}

//=========================================================================================
// Employees, Messages and Reports
//=========================================================================================

#[derive(Debug, Clone)]
pub struct Employee {
    pub id: Uuid,
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

#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub user_id: Option<Uuid>,
    pub full_name: String,
    pub email: String,
    pub designation: String,
    pub department: String,
    pub joining_date: NaiveDate,
}

impl NewEmployee {
    pub fn into_record(self, id: Uuid, employee_id: String, now: DateTime<Utc>) -> Employee {
        Employee {
            id,
            employee_id,
            user_id: self.user_id,
            full_name: self.full_name,
            email: self.email,
            designation: self.designation,
            department: self.department,
            joining_date: self.joining_date,
            is_active: true,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub subject: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub subject: String,
    pub body: String,
}

/// A weekly progress report filed by an intern against their application.
#[derive(Debug, Clone)]
pub struct Report {
    pub id: Uuid,
    pub application_id: Uuid,
    pub submitted_by: Uuid,
    pub week_number: i32,
    pub summary: String,
    pub status: ReportStatus,
    pub feedback: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub application_id: Uuid,
    pub submitted_by: Uuid,
    pub week_number: i32,
    pub summary: String,
}

//=========================================================================================
// Verification Audit
//=========================================================================================

/// One append-only record of a public verification attempt.
#[derive(Debug, Clone)]
pub struct VerificationLog {
    pub id: Uuid,
    pub document_kind: DocumentKind,
    /// The matched document's id, or [`UNKNOWN_DOCUMENT_ID`].
    pub document_id: String,
    pub token: String,
    pub requester_ip: Option<String>,
    pub user_agent: Option<String>,
    pub result: VerificationResult,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVerificationLog {
    pub document_kind: DocumentKind,
    pub document_id: String,
    pub token: String,
    pub requester_ip: Option<String>,
    pub user_agent: Option<String>,
    pub result: VerificationResult,
}

/// Per-entity totals shown on the admin dashboard.
#[derive(Debug, Clone, Default)]
pub struct DashboardStats {
    pub applications: i64,
    pub applications_by_status: Vec<(ApplicationStatus, i64)>,
    pub certificates: i64,
    pub offer_letters: i64,
    pub mous: i64,
    pub employees: i64,
    pub contacts: i64,
    pub programs: i64,
}

impl fmt::Display for InternshipApplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.application_number, self.status)
    }
}

/// Parses an optional stored string into a text enum.
pub fn parse_optional<T: FromStr>(value: Option<&str>) -> Result<Option<T>, T::Err> {
    value.map(str::parse).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_offer() -> OfferLetter {
        NewOfferLetter {
            application_id: None,
            candidate_user_id: None,
            candidate_name: "Asha Rao".to_string(),
            candidate_email: "asha@example.com".to_string(),
            position: "Backend Intern".to_string(),
            department: "Platform".to_string(),
            stipend: None,
            start_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            end_date: None,
            issued_by: None,
        }
        .into_record(
            Uuid::new_v4(),
            "OFR-2026-00001".to_string(),
            "0123456789ABCDEF".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn unknown_text_names_the_enum() {
        let err = "archived".parse::<MouStatus>().unwrap_err();
        assert_eq!(err.to_string(), "'archived' is not a valid MoU status");
        assert_eq!("offer_letter".parse::<DocumentKind>(), Ok(DocumentKind::OfferLetter));
        assert_eq!(parse_optional::<Role>(None), Ok(None));
        assert!(parse_optional::<Role>(Some("Admin")).is_err());
    }

    #[test]
    fn offers_can_be_answered_once() {
        let mut offer = pending_offer();
        assert!(offer.respond(OfferDecision::Accept, Utc::now()));
        assert_eq!(offer.status, OfferStatus::Accepted);
        assert!(offer.accepted_at.is_some());

        assert!(!offer.respond(OfferDecision::Reject, Utc::now()));
        assert_eq!(offer.status, OfferStatus::Accepted);
        assert!(offer.rejected_at.is_none());
    }

    #[test]
    fn candidates_only_reach_their_own_records() {
        let me = Uuid::new_v4();
        let candidate = Actor { user_id: me, role: Role::Candidate };
        let admin = Actor { user_id: Uuid::new_v4(), role: Role::Admin };

        assert!(candidate.can_access(Some(me)));
        assert!(!candidate.can_access(Some(Uuid::new_v4())));
        assert!(!candidate.can_access(None));
        assert!(admin.can_access(None));
    }
}
