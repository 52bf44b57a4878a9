//! Service configuration.

use crm_core::pagination::CursorConfig;

/// Settings shared by the record services.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Sender address of notification mails.
    pub mail_from: String,
    /// Page size bounds of the appointment listing.
    pub appointment_pages: CursorConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            mail_from: "noreply@example.org".into(),
            appointment_pages: CursorConfig::DEFAULT,
        }
    }
}
