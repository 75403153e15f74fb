pub mod applications;
pub mod domain;
pub mod error;
pub mod identifiers;
pub mod issuance;
pub mod lifecycle;
pub mod ports;
pub mod stats;
pub mod validation;
pub mod verification;

pub use applications::{ApplicationService, TransitionRequest};
pub use error::{FieldError, ServiceError, ServiceResult};
pub use issuance::{IssuanceService, Issued};
pub use lifecycle::{ApplicationStatus, LifecycleError, TransitionPolicy};
pub use ports::{
    DatabaseService, DocumentRenderer, EmailKind, EmailService, PortError, PortResult,
    RenderableDocument,
};
pub use verification::{Requester, VerificationOutcome, VerificationService};
