//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use std::sync::Arc;
use veridant_core::ports::{DatabaseService, DocumentRenderer, EmailService};
use veridant_core::{ApplicationService, IssuanceService, VerificationService};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub email: Arc<dyn EmailService>,
    pub applications: ApplicationService,
    pub issuance: IssuanceService,
    pub verification: VerificationService,
}

impl AppState {
    /// Wires the core services over the given adapters.
    pub fn new(
        db: Arc<dyn DatabaseService>,
        renderer: Arc<dyn DocumentRenderer>,
        email: Arc<dyn EmailService>,
        config: Arc<Config>,
    ) -> Self {
        let applications =
            ApplicationService::new(db.clone(), email.clone(), config.transition_policy);
        let issuance = IssuanceService::new(
            db.clone(),
            renderer,
            email.clone(),
            config.public_base_url.clone(),
        );
        let verification = VerificationService::new(db.clone());
        Self {
            db,
            config,
            email,
            applications,
            issuance,
            verification,
        }
    }
}
