//! services/api/src/adapters/email.rs
//!
//! An `EmailService` that writes each templated email to the log instead of
//! handing it to a mail provider.

use async_trait::async_trait;
use tracing::info;
use veridant_core::ports::{EmailKind, EmailService};

#[derive(Clone, Debug)]
pub struct LogEmailAdapter {
    from: String,
}

impl LogEmailAdapter {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl EmailService for LogEmailAdapter {
    async fn send_templated_email(
        &self,
        kind: EmailKind,
        recipient: &str,
        variables: &[(&str, String)],
    ) -> bool {
        let rendered = variables
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ");
        info!(
            from = %self.from,
            to = %recipient,
            template = kind.template_name(),
            variables = %rendered,
            "Templated email queued"
        );
        true
    }
}
