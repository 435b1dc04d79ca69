//! Email vendor adapters.

mod mailgun;
mod resend;
mod sendgrid;
mod smtp;

pub use mailgun::{MailgunConfig, MailgunProvider};
pub use resend::{ResendConfig, ResendProvider};
pub use sendgrid::{SendGridConfig, SendGridProvider};
pub use smtp::{SmtpConfig, SmtpProvider, TlsMode};
