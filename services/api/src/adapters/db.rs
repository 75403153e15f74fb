//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Sequence-numbered rows are created inside one transaction that bumps the
//! kind's row in `reference_sequences` (locking it until commit), derives the
//! reference number from the previous value, claims the verification token in
//! `document_tokens` and inserts the row. A unique violation rolls the whole
//! attempt back and it is retried with a fresh token.

use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::warn;
use uuid::Uuid;
use veridant_core::domain::{
    parse_optional, ApplicationFilter, Certificate, CollegeMou, Contact, ContactStatus,
    DocumentKind, Employee, InternshipApplication, Message, NewApplication, NewCertificate,
    NewContact, NewEmployee, NewMessage, NewMou, NewOfferLetter, NewProgram, NewReport,
    NewVerificationLog, OfferDecision, OfferLetter, Program, ProgramUpdate, Report, Role,
    StatusChange, StatusHistoryEntry, User, UserCredentials, VerificationLog,
};
use veridant_core::identifiers::{reference_number, verification_token, ReferenceKind};
use veridant_core::lifecycle::ApplicationStatus;
use veridant_core::ports::{DatabaseService, PortError, PortResult};

/// How many times a create is attempted when it hits a unique constraint.
const MAX_INSERT_ATTEMPTS: u32 = 5;

/// Unique constraints that a retry can never get past.
const PERMANENT_CONSTRAINTS: &[&str] = &[
    "certificates_one_per_application",
    "offer_letters_one_per_application",
];

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// Error Mapping and Retry Helpers
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

fn is_permanent_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db
            .constraint()
            .is_some_and(|name| PERMANENT_CONSTRAINTS.contains(&name)),
        _ => false,
    }
}

fn bad_column(e: impl std::fmt::Display) -> PortError {
    PortError::Unexpected(format!("Corrupt row: {e}"))
}

/// Runs `attempt` until it succeeds, fails with something other than a
/// retryable unique violation, or runs out of attempts. Number and token
/// collisions are retried with fresh values.
async fn retry_on_unique<T, F, Fut>(what: &'static str, mut attempt: F) -> PortResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut tries = 1;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if is_permanent_violation(&e) => {
                return Err(PortError::Conflict(format!("Could not create {what}: {e}")))
            }
            Err(e) if is_unique_violation(&e) && tries < MAX_INSERT_ATTEMPTS => {
                warn!(what, tries, "Unique constraint hit while creating row, retrying");
                tries += 1;
            }
            Err(e) if is_unique_violation(&e) => {
                return Err(PortError::Conflict(format!("Could not create {what}: {e}")))
            }
            Err(e) => return Err(unexpected(e)),
        }
    }
}

/// Bumps the counter for `kind` and returns the number of rows issued before
/// this one. The counter row stays locked until the transaction ends.
async fn claim_sequence(
    tx: &mut Transaction<'_, Postgres>,
    kind: ReferenceKind,
) -> Result<u64, sqlx::Error> {
    let previous: i64 = sqlx::query_scalar(
        "UPDATE reference_sequences SET issued = issued + 1 WHERE kind = $1 RETURNING issued - 1",
    )
    .bind(kind.key())
    .fetch_one(&mut **tx)
    .await?;
    Ok(previous.max(0) as u64)
}

async fn claim_token(
    tx: &mut Transaction<'_, Postgres>,
    kind: DocumentKind,
) -> Result<String, sqlx::Error> {
    let token = verification_token();
    sqlx::query("INSERT INTO document_tokens (token, document_kind) VALUES ($1, $2)")
        .bind(&token)
        .bind(kind.as_str())
        .execute(&mut **tx)
        .await?;
    Ok(token)
}

fn current_year() -> i32 {
    Utc::now().year()
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str = "id, email, full_name, role, password_hash, created_at";

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    full_name: String,
    role: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn role(&self) -> PortResult<Role> {
        self.role.parse().map_err(bad_column)
    }

    fn to_domain(self) -> PortResult<User> {
        Ok(User {
            role: self.role()?,
            id: self.id,
            email: self.email,
            full_name: self.full_name,
            created_at: self.created_at,
        })
    }

    fn to_credentials(self) -> PortResult<UserCredentials> {
        Ok(UserCredentials {
            role: self.role()?,
            user_id: self.id,
            email: self.email,
            hashed_password: self.password_hash,
        })
    }
}

const CONTACT_COLUMNS: &str = "id, name, email, phone, subject, message, status, created_at";

#[derive(FromRow)]
struct ContactRecord {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    subject: String,
    message: String,
    status: String,
    created_at: DateTime<Utc>,
}
impl ContactRecord {
    fn to_domain(self) -> PortResult<Contact> {
        Ok(Contact {
            status: self.status.parse().map_err(bad_column)?,
            id: self.id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            subject: self.subject,
            message: self.message,
            created_at: self.created_at,
        })
    }
}

const PROGRAM_COLUMNS: &str = "id, title, description, department, duration_weeks, stipend, location, is_active, created_at, updated_at";

#[derive(FromRow)]
struct ProgramRecord {
    id: Uuid,
    title: String,
    description: String,
    department: String,
    duration_weeks: i32,
    stipend: Option<i64>,
    location: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ProgramRecord {
    fn to_domain(self) -> Program {
        Program {
            id: self.id,
            title: self.title,
            description: self.description,
            department: self.department,
            duration_weeks: self.duration_weeks,
            stipend: self.stipend,
            location: self.location,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const APPLICATION_COLUMNS: &str = "id, application_number, user_id, program_id, full_name, email, phone, date_of_birth, college_name, degree, branch, graduation_year, cgpa, resume_url, id_proof_url, marksheet_url, cover_letter, status, status_notes, interview_at, interview_mode, interview_link, created_at, updated_at";

#[derive(FromRow)]
struct ApplicationRecord {
    id: Uuid,
    application_number: String,
    user_id: Option<Uuid>,
    program_id: Option<Uuid>,
    full_name: String,
    email: String,
    phone: String,
    date_of_birth: Option<NaiveDate>,
    college_name: String,
    degree: String,
    branch: Option<String>,
    graduation_year: Option<i32>,
    cgpa: Option<String>,
    resume_url: Option<String>,
    id_proof_url: Option<String>,
    marksheet_url: Option<String>,
    cover_letter: Option<String>,
    status: String,
    status_notes: Option<String>,
    interview_at: Option<DateTime<Utc>>,
    interview_mode: Option<String>,
    interview_link: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ApplicationRecord {
    fn to_domain(self) -> PortResult<InternshipApplication> {
        Ok(InternshipApplication {
            status: self.status.parse().map_err(bad_column)?,
            id: self.id,
            application_number: self.application_number,
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
            status_notes: self.status_notes,
            interview_at: self.interview_at,
            interview_mode: self.interview_mode,
            interview_link: self.interview_link,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct HistoryRecord {
    id: Uuid,
    application_id: Uuid,
    previous_status: Option<String>,
    new_status: String,
    changed_by: Option<Uuid>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}
impl HistoryRecord {
    fn to_domain(self) -> PortResult<StatusHistoryEntry> {
        Ok(StatusHistoryEntry {
            previous_status: parse_optional(self.previous_status.as_deref()).map_err(bad_column)?,
            new_status: self.new_status.parse().map_err(bad_column)?,
            id: self.id,
            application_id: self.application_id,
            changed_by: self.changed_by,
            notes: self.notes,
            created_at: self.created_at,
        })
    }
}

const CERTIFICATE_COLUMNS: &str = "id, certificate_number, verification_token, application_id, employee_id, recipient_name, recipient_email, program_title, certificate_type, issue_date, valid_until, grade, mentor_name, status, revoked_reason, issued_by, created_at";

#[derive(FromRow)]
struct CertificateRecord {
    id: Uuid,
    certificate_number: String,
    verification_token: String,
    application_id: Option<Uuid>,
    employee_id: Option<Uuid>,
    recipient_name: String,
    recipient_email: Option<String>,
    program_title: String,
    certificate_type: String,
    issue_date: NaiveDate,
    valid_until: Option<NaiveDate>,
    grade: Option<String>,
    mentor_name: Option<String>,
    status: String,
    revoked_reason: Option<String>,
    issued_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}
impl CertificateRecord {
    fn to_domain(self) -> PortResult<Certificate> {
        Ok(Certificate {
            status: self.status.parse().map_err(bad_column)?,
            id: self.id,
            certificate_number: self.certificate_number,
            verification_token: self.verification_token,
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
            revoked_reason: self.revoked_reason,
            issued_by: self.issued_by,
            created_at: self.created_at,
        })
    }
}

const OFFER_COLUMNS: &str = "id, offer_number, verification_token, application_id, candidate_user_id, candidate_name, candidate_email, position, department, stipend, start_date, end_date, status, accepted_at, rejected_at, issued_by, created_at";

#[derive(FromRow)]
struct OfferLetterRecord {
    id: Uuid,
    offer_number: String,
    verification_token: String,
    application_id: Option<Uuid>,
    candidate_user_id: Option<Uuid>,
    candidate_name: String,
    candidate_email: String,
    position: String,
    department: String,
    stipend: Option<i64>,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    status: String,
    accepted_at: Option<DateTime<Utc>>,
    rejected_at: Option<DateTime<Utc>>,
    issued_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}
impl OfferLetterRecord {
    fn to_domain(self) -> PortResult<OfferLetter> {
        Ok(OfferLetter {
            status: self.status.parse().map_err(bad_column)?,
            id: self.id,
            offer_number: self.offer_number,
            verification_token: self.verification_token,
            application_id: self.application_id,
            candidate_user_id: self.candidate_user_id,
            candidate_name: self.candidate_name,
            candidate_email: self.candidate_email,
            position: self.position,
            department: self.department,
            stipend: self.stipend,
            start_date: self.start_date,
            end_date: self.end_date,
            accepted_at: self.accepted_at,
            rejected_at: self.rejected_at,
            issued_by: self.issued_by,
            created_at: self.created_at,
        })
    }
}

const MOU_COLUMNS: &str = "id, mou_number, verification_token, college_name, college_address, college_signatory, college_email, company_signatory, purpose, start_date, end_date, status, revoked_reason, issued_by, created_at";

#[derive(FromRow)]
struct MouRecord {
    id: Uuid,
    mou_number: String,
    verification_token: String,
    college_name: String,
    college_address: String,
    college_signatory: String,
    college_email: Option<String>,
    company_signatory: String,
    purpose: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
    revoked_reason: Option<String>,
    issued_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}
impl MouRecord {
    fn to_domain(self) -> PortResult<CollegeMou> {
        Ok(CollegeMou {
            status: self.status.parse().map_err(bad_column)?,
            id: self.id,
            mou_number: self.mou_number,
            verification_token: self.verification_token,
            college_name: self.college_name,
            college_address: self.college_address,
            college_signatory: self.college_signatory,
            college_email: self.college_email,
            company_signatory: self.company_signatory,
            purpose: self.purpose,
            start_date: self.start_date,
            end_date: self.end_date,
            revoked_reason: self.revoked_reason,
            issued_by: self.issued_by,
            created_at: self.created_at,
        })
    }
}

const EMPLOYEE_COLUMNS: &str = "id, employee_id, user_id, full_name, email, designation, department, joining_date, is_active, created_at";

#[derive(FromRow)]
struct EmployeeRecord {
    id: Uuid,
    employee_id: String,
    user_id: Option<Uuid>,
    full_name: String,
    email: String,
    designation: String,
    department: String,
    joining_date: NaiveDate,
    is_active: bool,
    created_at: DateTime<Utc>,
}
impl EmployeeRecord {
    fn to_domain(self) -> Employee {
        Employee {
            id: self.id,
            employee_id: self.employee_id,
            user_id: self.user_id,
            full_name: self.full_name,
            email: self.email,
            designation: self.designation,
            department: self.department,
            joining_date: self.joining_date,
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

const MESSAGE_COLUMNS: &str = "id, sender_id, recipient_id, subject, body, is_read, created_at";

#[derive(FromRow)]
struct MessageRecord {
    id: Uuid,
    sender_id: Uuid,
    recipient_id: Uuid,
    subject: String,
    body: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}
impl MessageRecord {
    fn to_domain(self) -> Message {
        Message {
            id: self.id,
            sender_id: self.sender_id,
            recipient_id: self.recipient_id,
            subject: self.subject,
            body: self.body,
            is_read: self.is_read,
            created_at: self.created_at,
        }
    }
}

const REPORT_COLUMNS: &str = "id, application_id, submitted_by, week_number, summary, status, feedback, reviewed_by, created_at, reviewed_at";

#[derive(FromRow)]
struct ReportRecord {
    id: Uuid,
    application_id: Uuid,
    submitted_by: Uuid,
    week_number: i32,
    summary: String,
    status: String,
    feedback: Option<String>,
    reviewed_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
}
impl ReportRecord {
    fn to_domain(self) -> PortResult<Report> {
        Ok(Report {
            status: self.status.parse().map_err(bad_column)?,
            id: self.id,
            application_id: self.application_id,
            submitted_by: self.submitted_by,
            week_number: self.week_number,
            summary: self.summary,
            feedback: self.feedback,
            reviewed_by: self.reviewed_by,
            created_at: self.created_at,
            reviewed_at: self.reviewed_at,
        })
    }
}

const VERIFICATION_LOG_COLUMNS: &str = "id, document_kind, document_id, token, requester_ip, user_agent, result, created_at";

#[derive(FromRow)]
struct VerificationLogRecord {
    id: Uuid,
    document_kind: String,
    document_id: String,
    token: String,
    requester_ip: Option<String>,
    user_agent: Option<String>,
    result: String,
    created_at: DateTime<Utc>,
}
impl VerificationLogRecord {
    fn to_domain(self) -> PortResult<VerificationLog> {
        Ok(VerificationLog {
            document_kind: self.document_kind.parse().map_err(bad_column)?,
            result: self.result.parse().map_err(bad_column)?,
            id: self.id,
            document_id: self.document_id,
            token: self.token,
            requester_ip: self.requester_ip,
            user_agent: self.user_agent,
            created_at: self.created_at,
        })
    }
}

//=========================================================================================
// Transactional Inserts
//=========================================================================================

impl DbAdapter {
    async fn insert_application(
        &self,
        a: &NewApplication,
    ) -> Result<ApplicationRecord, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let count = claim_sequence(&mut tx, ReferenceKind::Application).await?;
        let number = reference_number(ReferenceKind::Application, count, current_year());

        let record = sqlx::query_as::<_, ApplicationRecord>(&format!(
            "INSERT INTO internship_applications (id, application_number, user_id, program_id, full_name, email, phone, date_of_birth, college_name, degree, branch, graduation_year, cgpa, resume_url, id_proof_url, marksheet_url, cover_letter, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) RETURNING {APPLICATION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&number)
        .bind(a.user_id)
        .bind(a.program_id)
        .bind(&a.full_name)
        .bind(&a.email)
        .bind(&a.phone)
        .bind(a.date_of_birth)
        .bind(&a.college_name)
        .bind(&a.degree)
        .bind(&a.branch)
        .bind(a.graduation_year)
        .bind(&a.cgpa)
        .bind(&a.resume_url)
        .bind(&a.id_proof_url)
        .bind(&a.marksheet_url)
        .bind(&a.cover_letter)
        .bind(ApplicationStatus::Submitted.as_str())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO application_status_history (id, application_id, previous_status, new_status, changed_by, notes, created_at) \
             VALUES ($1, $2, NULL, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(record.id)
        .bind(ApplicationStatus::Submitted.as_str())
        .bind(record.user_id)
        .bind("Application submitted")
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn insert_certificate(
        &self,
        c: &NewCertificate,
    ) -> Result<CertificateRecord, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let count = claim_sequence(&mut tx, ReferenceKind::Certificate).await?;
        let number = reference_number(ReferenceKind::Certificate, count, current_year());
        let token = claim_token(&mut tx, DocumentKind::Certificate).await?;

        let record = sqlx::query_as::<_, CertificateRecord>(&format!(
            "INSERT INTO certificates (id, certificate_number, verification_token, application_id, employee_id, recipient_name, recipient_email, program_title, certificate_type, issue_date, valid_until, grade, mentor_name, status, issued_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 'issued', $14) RETURNING {CERTIFICATE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&number)
        .bind(&token)
        .bind(c.application_id)
        .bind(c.employee_id)
        .bind(&c.recipient_name)
        .bind(&c.recipient_email)
        .bind(&c.program_title)
        .bind(&c.certificate_type)
        .bind(c.issue_date)
        .bind(c.valid_until)
        .bind(&c.grade)
        .bind(&c.mentor_name)
        .bind(c.issued_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn insert_offer_letter(
        &self,
        o: &NewOfferLetter,
    ) -> Result<OfferLetterRecord, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let count = claim_sequence(&mut tx, ReferenceKind::OfferLetter).await?;
        let number = reference_number(ReferenceKind::OfferLetter, count, current_year());
        let token = claim_token(&mut tx, DocumentKind::OfferLetter).await?;

        let record = sqlx::query_as::<_, OfferLetterRecord>(&format!(
            "INSERT INTO offer_letters (id, offer_number, verification_token, application_id, candidate_user_id, candidate_name, candidate_email, position, department, stipend, start_date, end_date, status, issued_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'pending', $13) RETURNING {OFFER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&number)
        .bind(&token)
        .bind(o.application_id)
        .bind(o.candidate_user_id)
        .bind(&o.candidate_name)
        .bind(&o.candidate_email)
        .bind(&o.position)
        .bind(&o.department)
        .bind(o.stipend)
        .bind(o.start_date)
        .bind(o.end_date)
        .bind(o.issued_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn insert_mou(&self, m: &NewMou) -> Result<MouRecord, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let count = claim_sequence(&mut tx, ReferenceKind::Mou).await?;
        let number = reference_number(ReferenceKind::Mou, count, current_year());
        let token = claim_token(&mut tx, DocumentKind::Mou).await?;

        let record = sqlx::query_as::<_, MouRecord>(&format!(
            "INSERT INTO college_mous (id, mou_number, verification_token, college_name, college_address, college_signatory, college_email, company_signatory, purpose, start_date, end_date, status, issued_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'active', $12) RETURNING {MOU_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&number)
        .bind(&token)
        .bind(&m.college_name)
        .bind(&m.college_address)
        .bind(&m.college_signatory)
        .bind(&m.college_email)
        .bind(&m.company_signatory)
        .bind(&m.purpose)
        .bind(m.start_date)
        .bind(m.end_date)
        .bind(m.issued_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn insert_employee(&self, e: &NewEmployee) -> Result<EmployeeRecord, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let count = claim_sequence(&mut tx, ReferenceKind::Employee).await?;
        let number = reference_number(ReferenceKind::Employee, count, current_year());

        let record = sqlx::query_as::<_, EmployeeRecord>(&format!(
            "INSERT INTO employees (id, employee_id, user_id, full_name, email, designation, department, joining_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {EMPLOYEE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&number)
        .bind(e.user_id)
        .bind(&e.full_name)
        .bind(&e.email)
        .bind(&e.designation)
        .bind(&e.department)
        .bind(e.joining_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn exists(&self, table: &str, id: Uuid) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(&format!(
            "SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1)"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn count(&self, table: &str) -> PortResult<i64> {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- Users & Auth ---

    async fn create_user(
        &self,
        email: &str,
        full_name: &str,
        hashed_password: &str,
        role: Role,
    ) -> PortResult<User> {
        let email = email.trim().to_lowercase();
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, email, full_name, role, password_hash) VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(full_name)
        .bind(role.as_str())
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                PortError::Conflict(format!("User {email} already exists"))
            } else {
                unexpected(e)
            }
        })?;
        record.to_domain()
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<Option<User>> {
        sqlx::query_as::<_, UserRecord>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(UserRecord::to_domain)
            .transpose()
    }

    async fn get_user_credentials(&self, email: &str) -> PortResult<Option<UserCredentials>> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(UserRecord::to_credentials)
        .transpose()
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Option<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    // --- Contacts ---

    async fn create_contact(&self, contact: NewContact) -> PortResult<Contact> {
        sqlx::query_as::<_, ContactRecord>(&format!(
            "INSERT INTO contacts (id, name, email, phone, subject, message, status) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(contact.name)
        .bind(contact.email)
        .bind(contact.phone)
        .bind(contact.subject)
        .bind(contact.message)
        .bind(ContactStatus::New.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?
        .to_domain()
    }

    async fn list_contacts(&self) -> PortResult<Vec<Contact>> {
        sqlx::query_as::<_, ContactRecord>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(ContactRecord::to_domain)
        .collect()
    }

    async fn update_contact_status(
        &self,
        contact_id: Uuid,
        status: ContactStatus,
    ) -> PortResult<Option<Contact>> {
        sqlx::query_as::<_, ContactRecord>(&format!(
            "UPDATE contacts SET status = $2 WHERE id = $1 RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(contact_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(ContactRecord::to_domain)
        .transpose()
    }

    async fn count_contacts(&self) -> PortResult<i64> {
        self.count("contacts").await
    }

    // --- Programs ---

    async fn create_program(&self, program: NewProgram) -> PortResult<Program> {
        let record = sqlx::query_as::<_, ProgramRecord>(&format!(
            "INSERT INTO programs (id, title, description, department, duration_weeks, stipend, location) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {PROGRAM_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(program.title)
        .bind(program.description)
        .bind(program.department)
        .bind(program.duration_weeks)
        .bind(program.stipend)
        .bind(program.location)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_program(&self, program_id: Uuid) -> PortResult<Option<Program>> {
        let record = sqlx::query_as::<_, ProgramRecord>(&format!(
            "SELECT {PROGRAM_COLUMNS} FROM programs WHERE id = $1"
        ))
        .bind(program_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(ProgramRecord::to_domain))
    }

    async fn list_programs(&self, active_only: bool) -> PortResult<Vec<Program>> {
        let records = sqlx::query_as::<_, ProgramRecord>(&format!(
            "SELECT {PROGRAM_COLUMNS} FROM programs WHERE ($1 = FALSE OR is_active) ORDER BY created_at ASC"
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(ProgramRecord::to_domain).collect())
    }

    async fn update_program(
        &self,
        program_id: Uuid,
        update: ProgramUpdate,
    ) -> PortResult<Option<Program>> {
        let record = sqlx::query_as::<_, ProgramRecord>(&format!(
            "UPDATE programs SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                department = COALESCE($4, department), \
                duration_weeks = COALESCE($5, duration_weeks), \
                stipend = COALESCE($6, stipend), \
                location = COALESCE($7, location), \
                is_active = COALESCE($8, is_active), \
                updated_at = now() \
             WHERE id = $1 RETURNING {PROGRAM_COLUMNS}"
        ))
        .bind(program_id)
        .bind(update.title)
        .bind(update.description)
        .bind(update.department)
        .bind(update.duration_weeks)
        .bind(update.stipend)
        .bind(update.location)
        .bind(update.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(ProgramRecord::to_domain))
    }

    async fn count_programs(&self) -> PortResult<i64> {
        self.count("programs").await
    }

    // --- Applications & Status History ---

    async fn create_application(
        &self,
        application: NewApplication,
    ) -> PortResult<InternshipApplication> {
        let draft = &application;
        retry_on_unique("application", move || self.insert_application(draft))
            .await?
            .to_domain()
    }

    async fn get_application(
        &self,
        application_id: Uuid,
    ) -> PortResult<Option<InternshipApplication>> {
        sqlx::query_as::<_, ApplicationRecord>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM internship_applications WHERE id = $1"
        ))
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(ApplicationRecord::to_domain)
        .transpose()
    }

    async fn get_application_by_number(
        &self,
        application_number: &str,
    ) -> PortResult<Option<InternshipApplication>> {
        sqlx::query_as::<_, ApplicationRecord>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM internship_applications WHERE application_number = $1"
        ))
        .bind(application_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(ApplicationRecord::to_domain)
        .transpose()
    }

    async fn list_applications(
        &self,
        filter: ApplicationFilter,
    ) -> PortResult<Vec<InternshipApplication>> {
        sqlx::query_as::<_, ApplicationRecord>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM internship_applications \
             WHERE ($1::TEXT IS NULL OR status = $1) \
               AND ($2::UUID IS NULL OR program_id = $2) \
               AND ($3::UUID IS NULL OR user_id = $3) \
             ORDER BY created_at DESC"
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.program_id)
        .bind(filter.user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(ApplicationRecord::to_domain)
        .collect()
    }

    async fn update_application_status(
        &self,
        application_id: Uuid,
        change: StatusChange,
    ) -> PortResult<Option<InternshipApplication>> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let stored: Option<String> = sqlx::query_scalar(
            "SELECT status FROM internship_applications WHERE id = $1 FOR UPDATE",
        )
        .bind(application_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?;
        let Some(stored) = stored else {
            return Ok(None);
        };
        if stored != change.expected.as_str() {
            return Err(PortError::Conflict(format!(
                "Application {application_id} is '{stored}', not '{}'",
                change.expected
            )));
        }

        let now = Utc::now();
        let record = sqlx::query_as::<_, ApplicationRecord>(&format!(
            "UPDATE internship_applications SET \
                status = $2, \
                status_notes = COALESCE($3, status_notes), \
                interview_at = COALESCE($4, interview_at), \
                interview_mode = COALESCE($5, interview_mode), \
                interview_link = COALESCE($6, interview_link), \
                updated_at = $7 \
             WHERE id = $1 RETURNING {APPLICATION_COLUMNS}"
        ))
        .bind(application_id)
        .bind(change.status.as_str())
        .bind(&change.notes)
        .bind(change.interview_at)
        .bind(&change.interview_mode)
        .bind(&change.interview_link)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        let entry = change.history_entry(application_id, now);
        sqlx::query(
            "INSERT INTO application_status_history (id, application_id, previous_status, new_status, changed_by, notes, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.id)
        .bind(entry.application_id)
        .bind(entry.previous_status.map(|s| s.as_str()))
        .bind(entry.new_status.as_str())
        .bind(entry.changed_by)
        .bind(&entry.notes)
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        record.to_domain().map(Some)
    }

    async fn list_status_history(
        &self,
        application_id: Uuid,
    ) -> PortResult<Vec<StatusHistoryEntry>> {
        sqlx::query_as::<_, HistoryRecord>(
            "SELECT id, application_id, previous_status, new_status, changed_by, notes, created_at \
             FROM application_status_history WHERE application_id = $1 ORDER BY created_at ASC, previous_status NULLS FIRST",
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(HistoryRecord::to_domain)
        .collect()
    }

    async fn count_applications(&self) -> PortResult<i64> {
        self.count("internship_applications").await
    }

    async fn count_applications_by_status(&self) -> PortResult<Vec<(ApplicationStatus, i64)>> {
        sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM internship_applications GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(|(status, n)| Ok((status.parse().map_err(bad_column)?, n)))
        .collect()
    }

    // --- Certificates ---

    async fn create_certificate(&self, certificate: NewCertificate) -> PortResult<Certificate> {
        let draft = &certificate;
        retry_on_unique("certificate", move || self.insert_certificate(draft))
            .await?
            .to_domain()
    }

    async fn get_certificate(&self, certificate_id: Uuid) -> PortResult<Option<Certificate>> {
        sqlx::query_as::<_, CertificateRecord>(&format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE id = $1"
        ))
        .bind(certificate_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(CertificateRecord::to_domain)
        .transpose()
    }

    async fn get_certificate_by_token(&self, token: &str) -> PortResult<Option<Certificate>> {
        sqlx::query_as::<_, CertificateRecord>(&format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE verification_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(CertificateRecord::to_domain)
        .transpose()
    }

    async fn list_certificates(&self) -> PortResult<Vec<Certificate>> {
        sqlx::query_as::<_, CertificateRecord>(&format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(CertificateRecord::to_domain)
        .collect()
    }

    async fn revoke_certificate(
        &self,
        certificate_id: Uuid,
        reason: &str,
    ) -> PortResult<Option<Certificate>> {
        let revoked = sqlx::query_as::<_, CertificateRecord>(&format!(
            "UPDATE certificates SET status = 'revoked', revoked_reason = $2 \
             WHERE id = $1 AND status = 'issued' RETURNING {CERTIFICATE_COLUMNS}"
        ))
        .bind(certificate_id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match revoked {
            Some(record) => record.to_domain().map(Some),
            None if self.exists("certificates", certificate_id).await? => Err(PortError::Conflict(
                format!("Certificate {certificate_id} is already revoked"),
            )),
            None => Ok(None),
        }
    }

    async fn count_certificates(&self) -> PortResult<i64> {
        self.count("certificates").await
    }

    // --- Offer Letters ---

    async fn create_offer_letter(&self, offer: NewOfferLetter) -> PortResult<OfferLetter> {
        let draft = &offer;
        retry_on_unique("offer letter", move || self.insert_offer_letter(draft))
            .await?
            .to_domain()
    }

    async fn get_offer_letter(&self, offer_id: Uuid) -> PortResult<Option<OfferLetter>> {
        sqlx::query_as::<_, OfferLetterRecord>(&format!(
            "SELECT {OFFER_COLUMNS} FROM offer_letters WHERE id = $1"
        ))
        .bind(offer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(OfferLetterRecord::to_domain)
        .transpose()
    }

    async fn get_offer_letter_by_token(&self, token: &str) -> PortResult<Option<OfferLetter>> {
        sqlx::query_as::<_, OfferLetterRecord>(&format!(
            "SELECT {OFFER_COLUMNS} FROM offer_letters WHERE verification_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(OfferLetterRecord::to_domain)
        .transpose()
    }

    async fn list_offer_letters(&self) -> PortResult<Vec<OfferLetter>> {
        sqlx::query_as::<_, OfferLetterRecord>(&format!(
            "SELECT {OFFER_COLUMNS} FROM offer_letters ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(OfferLetterRecord::to_domain)
        .collect()
    }

    async fn respond_to_offer_letter(
        &self,
        offer_id: Uuid,
        decision: OfferDecision,
    ) -> PortResult<Option<OfferLetter>> {
        let status = decision.resulting_status();
        let (accepted_at, rejected_at) = match decision {
            OfferDecision::Accept => (Some(Utc::now()), None),
            OfferDecision::Reject => (None, Some(Utc::now())),
        };
        let answered = sqlx::query_as::<_, OfferLetterRecord>(&format!(
            "UPDATE offer_letters SET status = $2, \
                accepted_at = COALESCE($3, accepted_at), \
                rejected_at = COALESCE($4, rejected_at) \
             WHERE id = $1 AND status = 'pending' RETURNING {OFFER_COLUMNS}"
        ))
        .bind(offer_id)
        .bind(status.as_str())
        .bind(accepted_at)
        .bind(rejected_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match answered {
            Some(record) => record.to_domain().map(Some),
            None if self.exists("offer_letters", offer_id).await? => Err(PortError::Conflict(
                format!("Offer letter {offer_id} has already been answered"),
            )),
            None => Ok(None),
        }
    }

    async fn count_offer_letters(&self) -> PortResult<i64> {
        self.count("offer_letters").await
    }

    // --- College MoUs ---

    async fn create_mou(&self, mou: NewMou) -> PortResult<CollegeMou> {
        let draft = &mou;
        retry_on_unique("MoU", move || self.insert_mou(draft))
            .await?
            .to_domain()
    }

    async fn get_mou(&self, mou_id: Uuid) -> PortResult<Option<CollegeMou>> {
        sqlx::query_as::<_, MouRecord>(&format!(
            "SELECT {MOU_COLUMNS} FROM college_mous WHERE id = $1"
        ))
        .bind(mou_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(MouRecord::to_domain)
        .transpose()
    }

    async fn get_mou_by_token(&self, token: &str) -> PortResult<Option<CollegeMou>> {
        sqlx::query_as::<_, MouRecord>(&format!(
            "SELECT {MOU_COLUMNS} FROM college_mous WHERE verification_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(MouRecord::to_domain)
        .transpose()
    }

    async fn list_mous(&self) -> PortResult<Vec<CollegeMou>> {
        sqlx::query_as::<_, MouRecord>(&format!(
            "SELECT {MOU_COLUMNS} FROM college_mous ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(MouRecord::to_domain)
        .collect()
    }

    async fn revoke_mou(&self, mou_id: Uuid, reason: &str) -> PortResult<Option<CollegeMou>> {
        let revoked = sqlx::query_as::<_, MouRecord>(&format!(
            "UPDATE college_mous SET status = 'revoked', revoked_reason = $2 \
             WHERE id = $1 AND status = 'active' RETURNING {MOU_COLUMNS}"
        ))
        .bind(mou_id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match revoked {
            Some(record) => record.to_domain().map(Some),
            None if self.exists("college_mous", mou_id).await? => Err(PortError::Conflict(
                format!("MoU {mou_id} is already revoked"),
            )),
            None => Ok(None),
        }
    }

    async fn count_mous(&self) -> PortResult<i64> {
        self.count("college_mous").await
    }

    // --- Employees ---

    async fn create_employee(&self, employee: NewEmployee) -> PortResult<Employee> {
        let draft = &employee;
        let record = retry_on_unique("employee", move || self.insert_employee(draft)).await?;
        Ok(record.to_domain())
    }

    async fn get_employee(&self, employee_id: Uuid) -> PortResult<Option<Employee>> {
        let record = sqlx::query_as::<_, EmployeeRecord>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = $1"
        ))
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(EmployeeRecord::to_domain))
    }

    async fn list_employees(&self) -> PortResult<Vec<Employee>> {
        let records = sqlx::query_as::<_, EmployeeRecord>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(EmployeeRecord::to_domain).collect())
    }

    async fn count_employees(&self) -> PortResult<i64> {
        self.count("employees").await
    }

    // --- Messages ---

    async fn create_message(&self, message: NewMessage) -> PortResult<Message> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            "INSERT INTO messages (id, sender_id, recipient_id, subject, body) VALUES ($1, $2, $3, $4, $5) RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(message.sender_id)
        .bind(message.recipient_id)
        .bind(message.subject)
        .bind(message.body)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_messages_for_user(&self, user_id: Uuid) -> PortResult<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE recipient_id = $1 OR sender_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(MessageRecord::to_domain).collect())
    }

    async fn mark_message_read(
        &self,
        message_id: Uuid,
        recipient_id: Uuid,
    ) -> PortResult<Option<Message>> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            "UPDATE messages SET is_read = TRUE WHERE id = $1 AND recipient_id = $2 RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(message_id)
        .bind(recipient_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(MessageRecord::to_domain))
    }

    // --- Reports ---

    async fn create_report(&self, report: NewReport) -> PortResult<Report> {
        sqlx::query_as::<_, ReportRecord>(&format!(
            "INSERT INTO reports (id, application_id, submitted_by, week_number, summary) VALUES ($1, $2, $3, $4, $5) RETURNING {REPORT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(report.application_id)
        .bind(report.submitted_by)
        .bind(report.week_number)
        .bind(report.summary)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?
        .to_domain()
    }

    async fn list_reports_for_application(&self, application_id: Uuid) -> PortResult<Vec<Report>> {
        sqlx::query_as::<_, ReportRecord>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE application_id = $1 ORDER BY week_number ASC, created_at ASC"
        ))
        .bind(application_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(ReportRecord::to_domain)
        .collect()
    }

    async fn review_report(
        &self,
        report_id: Uuid,
        reviewer_id: Uuid,
        feedback: &str,
    ) -> PortResult<Option<Report>> {
        sqlx::query_as::<_, ReportRecord>(&format!(
            "UPDATE reports SET status = 'reviewed', feedback = $2, reviewed_by = $3, reviewed_at = now() \
             WHERE id = $1 RETURNING {REPORT_COLUMNS}"
        ))
        .bind(report_id)
        .bind(feedback)
        .bind(reviewer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(ReportRecord::to_domain)
        .transpose()
    }

    // --- Verification Audit ---

    async fn append_verification_log(
        &self,
        log: NewVerificationLog,
    ) -> PortResult<VerificationLog> {
        sqlx::query_as::<_, VerificationLogRecord>(&format!(
            "INSERT INTO verification_logs (id, document_kind, document_id, token, requester_ip, user_agent, result) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {VERIFICATION_LOG_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(log.document_kind.as_str())
        .bind(log.document_id)
        .bind(log.token)
        .bind(log.requester_ip)
        .bind(log.user_agent)
        .bind(log.result.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?
        .to_domain()
    }

    async fn list_verification_logs(&self, limit: i64) -> PortResult<Vec<VerificationLog>> {
        sqlx::query_as::<_, VerificationLogRecord>(&format!(
            "SELECT {VERIFICATION_LOG_COLUMNS} FROM verification_logs ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(VerificationLogRecord::to_domain)
        .collect()
    }
}
