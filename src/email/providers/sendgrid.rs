use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::email::{
    EmailProvider, EmailProviderKind, SendEmailOptions, SendEmailResult, Sender, split_address,
};
use crate::error::{IntegrationError, require};
use crate::vendor::{self, VerifyResult};

#[derive(Debug, Clone)]
pub struct SendGridConfig {
    pub api_key: String,
    pub sender: Sender,
    pub api_url: String,
}

pub struct SendGridProvider {
    config: SendGridConfig,
    client: Client,
}

impl SendGridProvider {
    pub fn new(config: SendGridConfig, client: Client) -> Result<Self, IntegrationError> {
        require(&config.api_key, "api_key")?;
        require(&config.sender.email, "from_email")?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct SendGridRequest {
    personalizations: Vec<Personalization>,
    from: EmailAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<EmailAddress>,
    subject: String,
    content: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Personalization {
    to: Vec<EmailAddress>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cc: Vec<EmailAddress>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bcc: Vec<EmailAddress>,
}

#[derive(Debug, Serialize)]
struct EmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl EmailAddress {
    fn parse(raw: &str) -> Self {
        let (name, email) = split_address(raw);
        Self { email, name }
    }
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: String,
}

fn addresses(list: &[String]) -> Vec<EmailAddress> {
    list.iter()
        .filter(|a| !a.trim().is_empty())
        .map(|a| EmailAddress::parse(a))
        .collect()
}

#[async_trait]
impl EmailProvider for SendGridProvider {
    fn kind(&self) -> EmailProviderKind {
        EmailProviderKind::Sendgrid
    }

    async fn send(&self, options: &SendEmailOptions) -> SendEmailResult {
        if let Err(e) = options.validate() {
            return SendEmailResult::failed(e);
        }

        // SendGrid requires text/plain before text/html.
        let mut content = Vec::with_capacity(2);
        if let Some(text) = options.text.as_deref().filter(|t| !t.trim().is_empty()) {
            content.push(Content {
                content_type: "text/plain",
                value: text.to_string(),
            });
        }
        if !options.html.trim().is_empty() {
            content.push(Content {
                content_type: "text/html",
                value: options.html.clone(),
            });
        }

        let request = SendGridRequest {
            personalizations: vec![Personalization {
                to: options.recipients().map(EmailAddress::parse).collect(),
                cc: addresses(&options.cc),
                bcc: addresses(&options.bcc),
            }],
            from: EmailAddress::parse(&self.config.sender.from_for(options)),
            reply_to: self
                .config
                .sender
                .reply_to_for(options)
                .map(|r| EmailAddress::parse(&r)),
            subject: options.subject.clone(),
            content,
        };

        debug!(subject = %options.subject, "Sending email via SendGrid");

        let resp = match self
            .client
            .post(self.url("/v3/mail/send"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return SendEmailResult::failed(format!("SendGrid request failed: {e}")),
        };

        if !resp.status().is_success() {
            let error = vendor::read_failure("SendGrid", resp).await;
            warn!(%error, "SendGrid rejected email");
            return SendEmailResult::failed(error);
        }

        let message_id = resp
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        SendEmailResult::sent(message_id)
    }

    async fn verify(&self) -> VerifyResult {
        match self
            .client
            .get(self.url("/v3/scopes"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => VerifyResult::ok(),
            Ok(resp) => VerifyResult::failed(vendor::read_failure("SendGrid", resp).await),
            Err(e) => VerifyResult::failed(format!("SendGrid request failed: {e}")),
        }
    }
}
