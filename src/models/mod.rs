mod audit_event;
mod email_config;
mod email_log;
mod integration;
mod suppression;

pub use audit_event::AuditEvent;
pub use email_config::EmailProviderConfig;
pub use email_log::{EmailLog, EmailLogStatus, NewEmailLog};
pub use integration::OrganizationIntegrationConfig;
pub use suppression::EmailSuppression;
