//! services/api/src/web/mod.rs
//!
//! The axum HTTP layer: handlers grouped by resource, auth middleware and the
//! router that ties them together.

pub mod admin;
pub mod applications;
pub mod auth;
pub mod documents;
pub mod messages;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod verify;

pub use middleware::{require_admin, require_auth};
pub use rest::{build_router, ApiDoc};
pub use state::AppState;
