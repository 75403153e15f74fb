//! services/api/src/adapters/memory.rs
//!
//! An in-memory implementation of the `DatabaseService` port, used for local
//! development and tests. Nothing survives a restart.
//!
//! Every table sits behind one `RwLock`, so a create reads the row count,
//! derives the reference number and inserts the row under a single write
//! guard.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;
use veridant_core::domain::{
    ApplicationFilter, AuthSession, Certificate, CertificateStatus, CollegeMou, Contact,
    ContactStatus, Employee, InternshipApplication, Message, MouStatus, NewApplication,
    NewCertificate, NewContact, NewEmployee, NewMessage, NewMou, NewOfferLetter, NewProgram,
    NewReport, NewVerificationLog, OfferDecision, OfferLetter, Program, ProgramUpdate, Report,
    ReportStatus, Role, StatusChange, StatusHistoryEntry, User, UserCredentials, VerificationLog,
};
use veridant_core::identifiers::{reference_number, verification_token, ReferenceKind};
use veridant_core::lifecycle::ApplicationStatus;
use veridant_core::ports::{DatabaseService, PortError, PortResult};

//=========================================================================================
// Tables
//=========================================================================================

struct StoredUser {
    user: User,
    hashed_password: String,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, StoredUser>,
    auth_sessions: HashMap<String, AuthSession>,
    contacts: HashMap<Uuid, Contact>,
    programs: HashMap<Uuid, Program>,
    applications: HashMap<Uuid, InternshipApplication>,
    status_history: Vec<StatusHistoryEntry>,
    certificates: HashMap<Uuid, Certificate>,
    offer_letters: HashMap<Uuid, OfferLetter>,
    mous: HashMap<Uuid, CollegeMou>,
    employees: HashMap<Uuid, Employee>,
    messages: HashMap<Uuid, Message>,
    reports: HashMap<Uuid, Report>,
    verification_logs: Vec<VerificationLog>,
    /// Every token handed out, across all document kinds.
    tokens: HashSet<String>,
}

impl Tables {
    fn next_number(&self, kind: ReferenceKind) -> String {
        let count = match kind {
            ReferenceKind::Application => self.applications.len(),
            ReferenceKind::Certificate => self.certificates.len(),
            ReferenceKind::OfferLetter => self.offer_letters.len(),
            ReferenceKind::Employee => self.employees.len(),
            ReferenceKind::Mou => self.mous.len(),
        };
        reference_number(kind, count as u64, Utc::now().year())
    }

    fn issue_token(&mut self) -> String {
        loop {
            let token = verification_token();
            if self.tokens.insert(token.clone()) {
                return token;
            }
        }
    }
}

/// Collects values sorted by creation time, oldest first.
fn sorted_by_created<T: Clone>(
    values: impl Iterator<Item = T>,
    created: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut out: Vec<T> = values.collect();
    out.sort_by_key(|v| created(v));
    out
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A map-backed store implementing the `DatabaseService` port.
#[derive(Default)]
pub struct MemoryAdapter {
    tables: RwLock<Tables>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for MemoryAdapter {
    // --- Users & Auth ---

    async fn create_user(
        &self,
        email: &str,
        full_name: &str,
        hashed_password: &str,
        role: Role,
    ) -> PortResult<User> {
        let mut t = self.tables.write().await;
        let email = email.trim().to_lowercase();
        if t.users.values().any(|u| u.user.email == email) {
            return Err(PortError::Conflict(format!("User {email} already exists")));
        }
        let user = User {
            id: Uuid::new_v4(),
            email,
            full_name: full_name.to_string(),
            role,
            created_at: Utc::now(),
        };
        t.users.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                hashed_password: hashed_password.to_string(),
            },
        );
        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&user_id).map(|u| u.user.clone()))
    }

    async fn get_user_credentials(&self, email: &str) -> PortResult<Option<UserCredentials>> {
        let email = email.trim().to_lowercase();
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.user.email == email)
            .map(|u| UserCredentials {
                user_id: u.user.id,
                email: u.user.email.clone(),
                hashed_password: u.hashed_password.clone(),
                role: u.user.role,
            }))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.tables.write().await.auth_sessions.insert(
            session_id.to_string(),
            AuthSession {
                id: session_id.to_string(),
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Option<Uuid>> {
        Ok(self
            .tables
            .read()
            .await
            .auth_sessions
            .get(session_id)
            .filter(|s| s.expires_at > Utc::now())
            .map(|s| s.user_id))
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables.write().await.auth_sessions.remove(session_id);
        Ok(())
    }

    // --- Contacts ---

    async fn create_contact(&self, contact: NewContact) -> PortResult<Contact> {
        let record = Contact {
            id: Uuid::new_v4(),
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
            subject: contact.subject,
            message: contact.message,
            status: ContactStatus::New,
            created_at: Utc::now(),
        };
        self.tables.write().await.contacts.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_contacts(&self) -> PortResult<Vec<Contact>> {
        let t = self.tables.read().await;
        let mut contacts = sorted_by_created(t.contacts.values().cloned(), |c| c.created_at);
        contacts.reverse();
        Ok(contacts)
    }

    async fn update_contact_status(
        &self,
        contact_id: Uuid,
        status: ContactStatus,
    ) -> PortResult<Option<Contact>> {
        let mut t = self.tables.write().await;
        Ok(t.contacts.get_mut(&contact_id).map(|c| {
            c.status = status;
            c.clone()
        }))
    }

    async fn count_contacts(&self) -> PortResult<i64> {
        Ok(self.tables.read().await.contacts.len() as i64)
    }

    // --- Programs ---

    async fn create_program(&self, program: NewProgram) -> PortResult<Program> {
        let now = Utc::now();
        let record = Program {
            id: Uuid::new_v4(),
            title: program.title,
            description: program.description,
            department: program.department,
            duration_weeks: program.duration_weeks,
            stipend: program.stipend,
            location: program.location,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.programs.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_program(&self, program_id: Uuid) -> PortResult<Option<Program>> {
        Ok(self.tables.read().await.programs.get(&program_id).cloned())
    }

    async fn list_programs(&self, active_only: bool) -> PortResult<Vec<Program>> {
        let t = self.tables.read().await;
        Ok(sorted_by_created(
            t.programs.values().filter(|p| !active_only || p.is_active).cloned(),
            |p| p.created_at,
        ))
    }

    async fn update_program(
        &self,
        program_id: Uuid,
        update: ProgramUpdate,
    ) -> PortResult<Option<Program>> {
        let mut t = self.tables.write().await;
        Ok(t.programs.get_mut(&program_id).map(|p| {
            update.apply(p);
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn count_programs(&self) -> PortResult<i64> {
        Ok(self.tables.read().await.programs.len() as i64)
    }

    // --- Applications & Status History ---

    async fn create_application(
        &self,
        application: NewApplication,
    ) -> PortResult<InternshipApplication> {
        let mut t = self.tables.write().await;
        let number = t.next_number(ReferenceKind::Application);
        let record = application.into_record(Uuid::new_v4(), number, Utc::now());
        t.status_history.push(StatusHistoryEntry::initial(&record));
        t.applications.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_application(
        &self,
        application_id: Uuid,
    ) -> PortResult<Option<InternshipApplication>> {
        Ok(self.tables.read().await.applications.get(&application_id).cloned())
    }

    async fn get_application_by_number(
        &self,
        application_number: &str,
    ) -> PortResult<Option<InternshipApplication>> {
        Ok(self
            .tables
            .read()
            .await
            .applications
            .values()
            .find(|a| a.application_number == application_number)
            .cloned())
    }

    async fn list_applications(
        &self,
        filter: ApplicationFilter,
    ) -> PortResult<Vec<InternshipApplication>> {
        let t = self.tables.read().await;
        let mut applications = sorted_by_created(
            t.applications.values().filter(|a| filter.matches(a)).cloned(),
            |a| a.created_at,
        );
        applications.reverse();
        Ok(applications)
    }

    async fn update_application_status(
        &self,
        application_id: Uuid,
        change: StatusChange,
    ) -> PortResult<Option<InternshipApplication>> {
        let mut t = self.tables.write().await;
        let now = Utc::now();
        let Some(application) = t.applications.get_mut(&application_id) else {
            return Ok(None);
        };
        if application.status != change.expected {
            return Err(PortError::Conflict(format!(
                "Application {application_id} is '{}', not '{}'",
                application.status, change.expected
            )));
        }
        change.apply(application, now);
        let updated = application.clone();
        t.status_history.push(change.history_entry(application_id, now));
        Ok(Some(updated))
    }

    async fn list_status_history(
        &self,
        application_id: Uuid,
    ) -> PortResult<Vec<StatusHistoryEntry>> {
        Ok(self
            .tables
            .read()
            .await
            .status_history
            .iter()
            .filter(|h| h.application_id == application_id)
            .cloned()
            .collect())
    }

    async fn count_applications(&self) -> PortResult<i64> {
        Ok(self.tables.read().await.applications.len() as i64)
    }

    async fn count_applications_by_status(&self) -> PortResult<Vec<(ApplicationStatus, i64)>> {
        let t = self.tables.read().await;
        Ok(ApplicationStatus::ALL
            .iter()
            .map(|s| {
                let n = t.applications.values().filter(|a| a.status == *s).count();
                (*s, n as i64)
            })
            .filter(|(_, n)| *n > 0)
            .collect())
    }

    // --- Certificates ---

    async fn create_certificate(&self, certificate: NewCertificate) -> PortResult<Certificate> {
        let mut t = self.tables.write().await;
        if let Some(application_id) = certificate.application_id {
            if t.certificates.values().any(|c| c.application_id == Some(application_id)) {
                return Err(PortError::Conflict(format!(
                    "Application {application_id} already has a certificate"
                )));
            }
        }
        let number = t.next_number(ReferenceKind::Certificate);
        let token = t.issue_token();
        let record = certificate.into_record(Uuid::new_v4(), number, token, Utc::now());
        t.certificates.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_certificate(&self, certificate_id: Uuid) -> PortResult<Option<Certificate>> {
        Ok(self.tables.read().await.certificates.get(&certificate_id).cloned())
    }

    async fn get_certificate_by_token(&self, token: &str) -> PortResult<Option<Certificate>> {
        Ok(self
            .tables
            .read()
            .await
            .certificates
            .values()
            .find(|c| c.verification_token == token)
            .cloned())
    }

    async fn list_certificates(&self) -> PortResult<Vec<Certificate>> {
        let t = self.tables.read().await;
        Ok(sorted_by_created(t.certificates.values().cloned(), |c| c.created_at))
    }

    async fn revoke_certificate(
        &self,
        certificate_id: Uuid,
        reason: &str,
    ) -> PortResult<Option<Certificate>> {
        let mut t = self.tables.write().await;
        let Some(certificate) = t.certificates.get_mut(&certificate_id) else {
            return Ok(None);
        };
        if certificate.status == CertificateStatus::Revoked {
            return Err(PortError::Conflict(format!(
                "Certificate {} is already revoked",
                certificate.certificate_number
            )));
        }
        certificate.status = CertificateStatus::Revoked;
        certificate.revoked_reason = Some(reason.to_string());
        Ok(Some(certificate.clone()))
    }

    async fn count_certificates(&self) -> PortResult<i64> {
        Ok(self.tables.read().await.certificates.len() as i64)
    }

    // --- Offer Letters ---

    async fn create_offer_letter(&self, offer: NewOfferLetter) -> PortResult<OfferLetter> {
        let mut t = self.tables.write().await;
        if let Some(application_id) = offer.application_id {
            if t.offer_letters.values().any(|o| o.application_id == Some(application_id)) {
                return Err(PortError::Conflict(format!(
                    "Application {application_id} already has an offer letter"
                )));
            }
        }
        let number = t.next_number(ReferenceKind::OfferLetter);
        let token = t.issue_token();
        let record = offer.into_record(Uuid::new_v4(), number, token, Utc::now());
        t.offer_letters.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_offer_letter(&self, offer_id: Uuid) -> PortResult<Option<OfferLetter>> {
        Ok(self.tables.read().await.offer_letters.get(&offer_id).cloned())
    }

    async fn get_offer_letter_by_token(&self, token: &str) -> PortResult<Option<OfferLetter>> {
        Ok(self
            .tables
            .read()
            .await
            .offer_letters
            .values()
            .find(|o| o.verification_token == token)
            .cloned())
    }

    async fn list_offer_letters(&self) -> PortResult<Vec<OfferLetter>> {
        let t = self.tables.read().await;
        Ok(sorted_by_created(t.offer_letters.values().cloned(), |o| o.created_at))
    }

    async fn respond_to_offer_letter(
        &self,
        offer_id: Uuid,
        decision: OfferDecision,
    ) -> PortResult<Option<OfferLetter>> {
        let mut t = self.tables.write().await;
        let Some(offer) = t.offer_letters.get_mut(&offer_id) else {
            return Ok(None);
        };
        if !offer.respond(decision, Utc::now()) {
            return Err(PortError::Conflict(format!(
                "Offer letter {} is already {}",
                offer.offer_number, offer.status
            )));
        }
        Ok(Some(offer.clone()))
    }

    async fn count_offer_letters(&self) -> PortResult<i64> {
        Ok(self.tables.read().await.offer_letters.len() as i64)
    }

    // --- College MoUs ---

    async fn create_mou(&self, mou: NewMou) -> PortResult<CollegeMou> {
        let mut t = self.tables.write().await;
        let number = t.next_number(ReferenceKind::Mou);
        let token = t.issue_token();
        let record = mou.into_record(Uuid::new_v4(), number, token, Utc::now());
        t.mous.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_mou(&self, mou_id: Uuid) -> PortResult<Option<CollegeMou>> {
        Ok(self.tables.read().await.mous.get(&mou_id).cloned())
    }

    async fn get_mou_by_token(&self, token: &str) -> PortResult<Option<CollegeMou>> {
        Ok(self
            .tables
            .read()
            .await
            .mous
            .values()
            .find(|m| m.verification_token == token)
            .cloned())
    }

    async fn list_mous(&self) -> PortResult<Vec<CollegeMou>> {
        let t = self.tables.read().await;
        Ok(sorted_by_created(t.mous.values().cloned(), |m| m.created_at))
    }

    async fn revoke_mou(&self, mou_id: Uuid, reason: &str) -> PortResult<Option<CollegeMou>> {
        let mut t = self.tables.write().await;
        let Some(mou) = t.mous.get_mut(&mou_id) else {
            return Ok(None);
        };
        if mou.status == MouStatus::Revoked {
            return Err(PortError::Conflict(format!("MoU {} is already revoked", mou.mou_number)));
        }
        mou.status = MouStatus::Revoked;
        mou.revoked_reason = Some(reason.to_string());
        Ok(Some(mou.clone()))
    }

    async fn count_mous(&self) -> PortResult<i64> {
        Ok(self.tables.read().await.mous.len() as i64)
    }

    // --- Employees ---

    async fn create_employee(&self, employee: NewEmployee) -> PortResult<Employee> {
        let mut t = self.tables.write().await;
        let number = t.next_number(ReferenceKind::Employee);
        let record = employee.into_record(Uuid::new_v4(), number, Utc::now());
        t.employees.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_employee(&self, employee_id: Uuid) -> PortResult<Option<Employee>> {
        Ok(self.tables.read().await.employees.get(&employee_id).cloned())
    }

    async fn list_employees(&self) -> PortResult<Vec<Employee>> {
        let t = self.tables.read().await;
        Ok(sorted_by_created(t.employees.values().cloned(), |e| e.created_at))
    }

    async fn count_employees(&self) -> PortResult<i64> {
        Ok(self.tables.read().await.employees.len() as i64)
    }

    // --- Messages ---

    async fn create_message(&self, message: NewMessage) -> PortResult<Message> {
        let record = Message {
            id: Uuid::new_v4(),
            sender_id: message.sender_id,
            recipient_id: message.recipient_id,
            subject: message.subject,
            body: message.body,
            is_read: false,
            created_at: Utc::now(),
        };
        self.tables.write().await.messages.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_messages_for_user(&self, user_id: Uuid) -> PortResult<Vec<Message>> {
        let t = self.tables.read().await;
        let mut messages = sorted_by_created(
            t.messages
                .values()
                .filter(|m| m.recipient_id == user_id || m.sender_id == user_id)
                .cloned(),
            |m| m.created_at,
        );
        messages.reverse();
        Ok(messages)
    }

    async fn mark_message_read(
        &self,
        message_id: Uuid,
        recipient_id: Uuid,
    ) -> PortResult<Option<Message>> {
        let mut t = self.tables.write().await;
        Ok(t.messages
            .get_mut(&message_id)
            .filter(|m| m.recipient_id == recipient_id)
            .map(|m| {
                m.is_read = true;
                m.clone()
            }))
    }

    // --- Reports ---

    async fn create_report(&self, report: NewReport) -> PortResult<Report> {
        let record = Report {
            id: Uuid::new_v4(),
            application_id: report.application_id,
            submitted_by: report.submitted_by,
            week_number: report.week_number,
            summary: report.summary,
            status: ReportStatus::Submitted,
            feedback: None,
            reviewed_by: None,
            created_at: Utc::now(),
            reviewed_at: None,
        };
        self.tables.write().await.reports.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_reports_for_application(&self, application_id: Uuid) -> PortResult<Vec<Report>> {
        let t = self.tables.read().await;
        let mut reports: Vec<Report> = t
            .reports
            .values()
            .filter(|r| r.application_id == application_id)
            .cloned()
            .collect();
        reports.sort_by_key(|r| (r.week_number, r.created_at));
        Ok(reports)
    }

    async fn review_report(
        &self,
        report_id: Uuid,
        reviewer_id: Uuid,
        feedback: &str,
    ) -> PortResult<Option<Report>> {
        let mut t = self.tables.write().await;
        Ok(t.reports.get_mut(&report_id).map(|r| {
            r.status = ReportStatus::Reviewed;
            r.feedback = Some(feedback.to_string());
            r.reviewed_by = Some(reviewer_id);
            r.reviewed_at = Some(Utc::now());
            r.clone()
        }))
    }

    // --- Verification Audit ---

    async fn append_verification_log(
        &self,
        log: NewVerificationLog,
    ) -> PortResult<VerificationLog> {
        let record = VerificationLog {
            id: Uuid::new_v4(),
            document_kind: log.document_kind,
            document_id: log.document_id,
            token: log.token,
            requester_ip: log.requester_ip,
            user_agent: log.user_agent,
            result: log.result,
            created_at: Utc::now(),
        };
        self.tables.write().await.verification_logs.push(record.clone());
        Ok(record)
    }

    async fn list_verification_logs(&self, limit: i64) -> PortResult<Vec<VerificationLog>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .tables
            .read()
            .await
            .verification_logs
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}
