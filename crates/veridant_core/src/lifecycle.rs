//! crates/veridant_core/src/lifecycle.rs
//!
//! The internship application state machine.
//!
//! The forward path is `submitted → under_review → shortlisted →
//! interview_scheduled → selected → completed`. `rejected` and `withdrawn`
//! can be reached from every non-terminal state. `completed`, `rejected` and
//! `withdrawn` are terminal.

crate::text_enum! {
    pub enum ApplicationStatus as "application status" {
        Submitted => "submitted",
        UnderReview => "under_review",
        Shortlisted => "shortlisted",
        InterviewScheduled => "interview_scheduled",
        Selected => "selected",
        Completed => "completed",
        Rejected => "rejected",
        Withdrawn => "withdrawn",
    }
}

impl ApplicationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Completed
                | ApplicationStatus::Rejected
                | ApplicationStatus::Withdrawn
        )
    }

    /// The next step on the happy path, if any.
    pub fn next(&self) -> Option<ApplicationStatus> {
        use ApplicationStatus::*;
        match self {
            Submitted => Some(UnderReview),
            UnderReview => Some(Shortlisted),
            Shortlisted => Some(InterviewScheduled),
            InterviewScheduled => Some(Selected),
            Selected => Some(Completed),
            Completed | Rejected | Withdrawn => None,
        }
    }

    pub fn can_transition_to(&self, to: ApplicationStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(to, ApplicationStatus::Rejected | ApplicationStatus::Withdrawn)
            || self.next() == Some(to)
    }

    /// Documents (certificates, offer letters) may only be issued from here.
    pub fn allows_document_issuance(&self) -> bool {
        matches!(self, ApplicationStatus::Selected | ApplicationStatus::Completed)
    }
}

/// How illegal transitions are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Illegal transitions are refused.
    #[default]
    Strict,
    /// Any status may follow any other; illegal ones are only logged.
    Permissive,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("cannot move an application from '{from}' to '{to}'")]
    IllegalTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
}

impl TransitionPolicy {
    /// Decides whether `from → to` may be written.
    pub fn check(
        &self,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Result<(), LifecycleError> {
        if from.can_transition_to(to) {
            return Ok(());
        }
        match self {
            TransitionPolicy::Strict => Err(LifecycleError::IllegalTransition { from, to }),
            TransitionPolicy::Permissive => {
                tracing::warn!(%from, %to, "accepting illegal application status transition");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ApplicationStatus::*;
    use super::*;

    #[test]
    fn happy_path_is_legal_step_by_step() {
        let mut status = Submitted;
        let mut steps = 0;
        while let Some(next) = status.next() {
            assert!(status.can_transition_to(next), "{status} -> {next}");
            status = next;
            steps += 1;
        }
        assert_eq!(status, Completed);
        assert_eq!(steps, 5);
    }

    #[test]
    fn side_exits_from_every_open_state() {
        for from in ApplicationStatus::ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(from.can_transition_to(Rejected));
            assert!(from.can_transition_to(Withdrawn));
        }
    }

    #[test]
    fn terminal_states_are_closed() {
        for from in [Completed, Rejected, Withdrawn] {
            for to in ApplicationStatus::ALL {
                assert!(!from.can_transition_to(*to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn skipping_ahead_and_going_back_are_illegal() {
        assert!(!Submitted.can_transition_to(Selected));
        assert!(!Selected.can_transition_to(UnderReview));
        assert!(!Shortlisted.can_transition_to(Shortlisted));
    }

    #[test]
    fn strict_policy_rejects_and_permissive_accepts() {
        assert_eq!(
            TransitionPolicy::Strict.check(Submitted, Completed),
            Err(LifecycleError::IllegalTransition {
                from: Submitted,
                to: Completed
            })
        );
        assert!(TransitionPolicy::Permissive.check(Submitted, Completed).is_ok());
        assert!(TransitionPolicy::Strict.check(Submitted, UnderReview).is_ok());
    }

    #[test]
    fn status_text_round_trips() {
        for status in ApplicationStatus::ALL {
            assert_eq!(status.as_str().parse::<ApplicationStatus>(), Ok(*status));
        }
        assert!("hired".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn only_selected_and_completed_allow_issuance() {
        let allowed: Vec<_> = ApplicationStatus::ALL
            .iter()
            .filter(|s| s.allows_document_issuance())
            .collect();
        assert_eq!(allowed, vec![&Selected, &Completed]);
    }
}
