//! Outbound mail collaborator.
//!
//! The service never speaks SMTP itself. [`InMemoryMailer`] records
//! messages for tests and local runs, [`LogMailer`] writes them to the log.

use std::sync::{Arc, Mutex};

use tracing::info;

use crate::error::MailError;

/// A fully rendered e-mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    /// Plain text body.
    pub body: String,
    /// HTML alternative of `body`.
    pub html_body: String,
}

pub trait Mailer: Send + Sync {
    fn send(&self, email: OutboundEmail) -> impl Future<Output = Result<(), MailError>> + Send;
}

/// Collects sent mails in memory. Clones share the same outbox.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMailer {
    outbox: Arc<Mutex<Vec<OutboundEmail>>>,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every mail sent so far.
    pub fn outbox(&self) -> Vec<OutboundEmail> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }
}

impl Mailer for InMemoryMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError> {
        let mut outbox = self
            .outbox
            .lock()
            .map_err(|e| MailError::Transport(e.to_string()))?;
        outbox.push(email);
        Ok(())
    }
}

/// Logs every mail instead of delivering it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError> {
        if email.to.trim().is_empty() {
            return Err(MailError::InvalidRecipient(email.to));
        }
        info!(
            from = %email.from,
            to = %email.to,
            subject = %email.subject,
            body_len = email.body.len(),
            "Mail delivered to log"
        );
        Ok(())
    }
}
