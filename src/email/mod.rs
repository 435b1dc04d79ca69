pub mod factory;
pub mod providers;
pub mod service;
pub mod templates;
pub mod tracking;

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::vendor::VerifyResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailProviderKind {
    Resend,
    Smtp,
    Sendgrid,
    Mailgun,
}

impl EmailProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailProviderKind::Resend => "resend",
            EmailProviderKind::Smtp => "smtp",
            EmailProviderKind::Sendgrid => "sendgrid",
            EmailProviderKind::Mailgun => "mailgun",
        }
    }
}

impl FromStr for EmailProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resend" => Ok(EmailProviderKind::Resend),
            "smtp" => Ok(EmailProviderKind::Smtp),
            "sendgrid" => Ok(EmailProviderKind::Sendgrid),
            "mailgun" => Ok(EmailProviderKind::Mailgun),
            other => Err(format!("Unknown email provider: {other}")),
        }
    }
}

impl std::fmt::Display for EmailProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbound message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendEmailOptions {
    #[serde(deserialize_with = "one_or_many")]
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(default)]
    pub text: Option<String>,
    /// Overrides the configured sender, e.g. `"Acme Hiring <jobs@acme.com>"`.
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
}

impl SendEmailOptions {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            to: vec![to.into()],
            subject: subject.into(),
            html: html.into(),
            ..Default::default()
        }
    }

    /// Required-field check done by every adapter before calling out.
    pub fn validate(&self) -> Result<(), String> {
        if self.to.iter().all(|t| t.trim().is_empty()) {
            return Err("At least one recipient is required".to_string());
        }
        if self.subject.trim().is_empty() {
            return Err("Subject is required".to_string());
        }
        if self.html.trim().is_empty() && self.text.as_deref().is_none_or(|t| t.trim().is_empty()) {
            return Err("Email body is required".to_string());
        }
        Ok(())
    }

    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        self.to.iter().map(|t| t.trim()).filter(|t| !t.is_empty())
    }

    /// Bare, lowercased address of every `to`, `cc` and `bcc` recipient.
    pub fn delivery_addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self
            .to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(|raw| split_address(raw).1.to_lowercase())
            .filter(|addr| !addr.is_empty())
            .collect();
        addresses.sort();
        addresses.dedup();
        addresses
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

/// Outcome of one send.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SendEmailResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendEmailResult {
    pub fn sent(message_id: Option<String>) -> Self {
        Self {
            success: true,
            message_id,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            message_id: None,
            error: Some(if error.trim().is_empty() {
                "Unknown error".to_string()
            } else {
                error
            }),
        }
    }
}

/// Default sender identity of an organization.
#[derive(Debug, Clone, Default)]
pub struct Sender {
    pub email: String,
    pub name: Option<String>,
    pub reply_to: Option<String>,
}

impl Sender {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Default::default()
        }
    }

    pub fn formatted(&self) -> String {
        match self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => format!("{name} <{}>", self.email),
            None => self.email.clone(),
        }
    }

    /// `From` header for a message: the per-message override, else this sender.
    pub fn from_for(&self, options: &SendEmailOptions) -> String {
        options
            .from
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.formatted())
    }

    pub fn reply_to_for(&self, options: &SendEmailOptions) -> Option<String> {
        options
            .reply_to
            .clone()
            .or_else(|| self.reply_to.clone())
            .filter(|r| !r.trim().is_empty())
    }
}

/// Split `"Name <addr>"` into its parts. Bare addresses have no name.
pub fn split_address(raw: &str) -> (Option<String>, String) {
    let raw = raw.trim();
    if let (Some(start), true) = (raw.rfind('<'), raw.ends_with('>')) {
        let name = raw[..start].trim().trim_matches('"').trim();
        let addr = raw[start + 1..raw.len() - 1].trim();
        let name = (!name.is_empty()).then(|| name.to_string());
        return (name, addr.to_string());
    }
    (None, raw.to_string())
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    fn kind(&self) -> EmailProviderKind;

    /// Send one message. Vendor failures come back as `success: false`.
    async fn send(&self, options: &SendEmailOptions) -> SendEmailResult;

    /// Test the stored credentials with a cheap authenticated call.
    async fn verify(&self) -> VerifyResult;
}
