//! crates/veridant_core/src/applications.rs
//!
//! Submission, tracking and admin-driven status transitions of internship
//! applications.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{InternshipApplication, NewApplication, StatusChange, StatusHistoryEntry};
use crate::error::{FieldError, ServiceError, ServiceResult};
use crate::lifecycle::{ApplicationStatus, TransitionPolicy};
use crate::ports::{notify, DatabaseService, EmailKind, EmailService, PortError};
use crate::validation::validate_application;

/// An admin's request to move an application to a new status.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub status: ApplicationStatus,
    pub actor: Option<Uuid>,
    pub notes: Option<String>,
    pub interview_at: Option<DateTime<Utc>>,
    pub interview_mode: Option<String>,
    pub interview_link: Option<String>,
}

impl TransitionRequest {
    pub fn to(status: ApplicationStatus) -> Self {
        Self {
            status,
            actor: None,
            notes: None,
            interview_at: None,
            interview_mode: None,
            interview_link: None,
        }
    }
}

#[derive(Clone)]
pub struct ApplicationService {
    db: Arc<dyn DatabaseService>,
    email: Arc<dyn EmailService>,
    policy: TransitionPolicy,
}

impl ApplicationService {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        email: Arc<dyn EmailService>,
        policy: TransitionPolicy,
    ) -> Self {
        Self { db, email, policy }
    }

    /// Validates and stores a new application in `submitted`.
    pub async fn submit(
        &self,
        application: NewApplication,
    ) -> ServiceResult<InternshipApplication> {
        validate_application(&application)?;

        if let Some(program_id) = application.program_id {
            let open = self
                .db
                .get_program(program_id)
                .await?
                .is_some_and(|p| p.is_active);
            if !open {
                return Err(ServiceError::Validation(vec![FieldError::new(
                    "program_id",
                    "does not refer to an open program",
                )]));
            }
        }

        let created = self.db.create_application(application).await?;
        info!(application = %created, "Application submitted");

        notify(
            self.email.as_ref(),
            EmailKind::ApplicationReceived,
            &created.email,
            &[
                ("name", created.full_name.clone()),
                ("application_number", created.application_number.clone()),
            ],
        )
        .await;

        Ok(created)
    }

    /// Moves an application to `request.status`, writing one history entry.
    pub async fn transition(
        &self,
        application_id: Uuid,
        request: TransitionRequest,
    ) -> ServiceResult<InternshipApplication> {
        let current = self
            .db
            .get_application(application_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Application {application_id}")))?;

        self.policy.check(current.status, request.status)?;

        let change = StatusChange {
            expected: current.status,
            status: request.status,
            changed_by: request.actor,
            notes: request.notes,
            interview_at: request.interview_at,
            interview_mode: request.interview_mode,
            interview_link: request.interview_link,
        };

        let updated = match self.db.update_application_status(application_id, change).await {
            Ok(Some(updated)) => updated,
            Ok(None) => return Err(ServiceError::NotFound(format!("Application {application_id}"))),
            Err(PortError::Conflict(_)) => {
                warn!(%application_id, "Application status changed concurrently");
                return Err(ServiceError::Conflict(
                    "Application status was changed by another request; reload and retry".into(),
                ));
            }
            Err(e) => return Err(e.into()),
        };
        info!(
            application = %updated,
            previous = %current.status,
            "Application status changed"
        );

        let mut variables = vec![
            ("name", updated.full_name.clone()),
            ("application_number", updated.application_number.clone()),
            ("status", updated.status.to_string()),
        ];
        if let Some(notes) = &updated.status_notes {
            variables.push(("notes", notes.clone()));
        }
        if let Some(at) = updated.interview_at {
            variables.push(("interview_at", at.to_rfc3339()));
        }
        notify(
            self.email.as_ref(),
            EmailKind::ApplicationStatusChanged,
            &updated.email,
            &variables,
        )
        .await;

        Ok(updated)
    }

    pub async fn history(&self, application_id: Uuid) -> ServiceResult<Vec<StatusHistoryEntry>> {
        if self.db.get_application(application_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("Application {application_id}")));
        }
        Ok(self.db.list_status_history(application_id).await?)
    }

    /// Public lookup by the human-readable application number.
    pub async fn track(&self, application_number: &str) -> ServiceResult<InternshipApplication> {
        self.db
            .get_application_by_number(application_number.trim())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Application {application_number}")))
    }
}
