//! crates/veridant_core/src/error.rs
//!
//! Errors surfaced by the core services.

use crate::lifecycle::LifecycleError;
use crate::ports::PortError;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Input was rejected before anything was persisted.
    #[error("Validation failed for {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("{0} not found")]
    NotFound(String),

    /// The operation is not allowed in the target's current state.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Port(#[from] PortError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
