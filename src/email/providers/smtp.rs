use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::email::{EmailProvider, EmailProviderKind, SendEmailOptions, SendEmailResult, Sender};
use crate::error::{IntegrationError, require};
use crate::vendor::VerifyResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Implicit TLS, usually port 465.
    Tls,
    #[default]
    Starttls,
    /// Plaintext. Only for local relays.
    None,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub tls_mode: TlsMode,
    pub sender: Sender,
}

pub struct SmtpProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Sender,
}

impl SmtpProvider {
    pub fn new(config: SmtpConfig) -> Result<Self, IntegrationError> {
        require(&config.host, "host")?;
        require(&config.username, "username")?;
        require(&config.password, "password")?;
        require(&config.sender.email, "from_email")?;
        if config.port == 0 {
            return Err(IntegrationError::MissingCredential("port"));
        }

        let transport = build_transport(&config)?;
        Ok(Self {
            transport,
            sender: config.sender,
        })
    }

    fn build_message(&self, options: &SendEmailOptions) -> Result<(Message, String), String> {
        let from: Mailbox = self
            .sender
            .from_for(options)
            .parse()
            .map_err(|e| format!("Invalid from address: {e}"))?;

        let domain = from.email.domain().to_string();
        let message_id = format!("<{}@{domain}>", Uuid::now_v7());

        let mut builder = Message::builder()
            .from(from)
            .subject(options.subject.clone())
            .message_id(Some(message_id.clone()));

        for to in options.recipients() {
            builder = builder.to(to.parse().map_err(|e| format!("Invalid to address '{to}': {e}"))?);
        }
        for cc in options.cc.iter().filter(|c| !c.trim().is_empty()) {
            builder = builder.cc(cc.parse().map_err(|e| format!("Invalid cc address '{cc}': {e}"))?);
        }
        for bcc in options.bcc.iter().filter(|b| !b.trim().is_empty()) {
            builder = builder.bcc(bcc.parse().map_err(|e| format!("Invalid bcc address '{bcc}': {e}"))?);
        }
        if let Some(reply_to) = self.sender.reply_to_for(options) {
            builder = builder.reply_to(
                reply_to
                    .parse()
                    .map_err(|e| format!("Invalid reply-to address: {e}"))?,
            );
        }

        let text = options.text.as_deref().filter(|t| !t.trim().is_empty());
        let message = match (text, options.html.trim().is_empty()) {
            (Some(text), false) => builder.multipart(MultiPart::alternative_plain_html(
                text.to_string(),
                options.html.clone(),
            )),
            (Some(text), true) => builder.singlepart(SinglePart::plain(text.to_string())),
            (None, _) => builder.singlepart(SinglePart::html(options.html.clone())),
        }
        .map_err(|e| format!("Failed to build email: {e}"))?;

        Ok((message, message_id))
    }
}

fn build_transport(config: &SmtpConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, IntegrationError> {
    let creds = Credentials::new(config.username.clone(), config.password.clone());
    let host = config.host.trim();

    let transport = match config.tls_mode {
        TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| IntegrationError::InvalidConfig(format!("SMTP relay error: {e}")))?
            .port(config.port)
            .credentials(creds)
            .build(),
        TlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(config.port)
            .credentials(creds)
            .build(),
        TlsMode::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| IntegrationError::InvalidConfig(format!("SMTP starttls error: {e}")))?
            .port(config.port)
            .credentials(creds)
            .build(),
    };

    Ok(transport)
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    fn kind(&self) -> EmailProviderKind {
        EmailProviderKind::Smtp
    }

    async fn send(&self, options: &SendEmailOptions) -> SendEmailResult {
        if let Err(e) = options.validate() {
            return SendEmailResult::failed(e);
        }

        let (message, message_id) = match self.build_message(options) {
            Ok(built) => built,
            Err(e) => return SendEmailResult::failed(e),
        };

        debug!(subject = %options.subject, "Sending email via SMTP");

        match self.transport.send(message).await {
            Ok(_) => SendEmailResult::sent(Some(message_id)),
            Err(e) => {
                warn!(error = %e, "SMTP send failed");
                SendEmailResult::failed(format!("SMTP error: {e}"))
            }
        }
    }

    async fn verify(&self) -> VerifyResult {
        match self.transport.test_connection().await {
            Ok(true) => VerifyResult::ok(),
            Ok(false) => VerifyResult::failed("SMTP server did not accept the connection"),
            Err(e) => VerifyResult::failed(format!("SMTP error: {e}")),
        }
    }
}
