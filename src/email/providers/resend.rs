use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::email::{EmailProvider, EmailProviderKind, SendEmailOptions, SendEmailResult, Sender};
use crate::error::{IntegrationError, require};
use crate::vendor::{self, VerifyResult};

#[derive(Debug, Clone)]
pub struct ResendConfig {
    pub api_key: String,
    pub sender: Sender,
    pub api_url: String,
}

pub struct ResendProvider {
    config: ResendConfig,
    client: Client,
}

impl ResendProvider {
    pub fn new(config: ResendConfig, client: Client) -> Result<Self, IntegrationError> {
        require(&config.api_key, "api_key")?;
        require(&config.sender.email, "from_email")?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct ResendRequest<'a> {
    from: String,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cc: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bcc: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<String>,
}

fn non_blank(list: &[String]) -> Vec<&str> {
    list.iter().map(|a| a.trim()).filter(|a| !a.is_empty()).collect()
}

#[derive(Debug, Deserialize)]
struct ResendResponse {
    id: String,
}

#[async_trait]
impl EmailProvider for ResendProvider {
    fn kind(&self) -> EmailProviderKind {
        EmailProviderKind::Resend
    }

    async fn send(&self, options: &SendEmailOptions) -> SendEmailResult {
        if let Err(e) = options.validate() {
            return SendEmailResult::failed(e);
        }

        let request = ResendRequest {
            from: self.config.sender.from_for(options),
            to: options.recipients().collect(),
            subject: &options.subject,
            html: &options.html,
            text: options.text.as_deref(),
            cc: non_blank(&options.cc),
            bcc: non_blank(&options.bcc),
            reply_to: self.config.sender.reply_to_for(options),
        };

        debug!(recipients = request.to.len(), subject = %options.subject, "Sending email via Resend");

        let resp = match self
            .client
            .post(self.url("/emails"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return SendEmailResult::failed(format!("Resend request failed: {e}")),
        };

        if !resp.status().is_success() {
            let error = vendor::read_failure("Resend", resp).await;
            warn!(%error, "Resend rejected email");
            return SendEmailResult::failed(error);
        }

        match resp.json::<ResendResponse>().await {
            Ok(body) => SendEmailResult::sent(Some(body.id)),
            Err(e) => SendEmailResult::failed(format!("Resend returned an unexpected response: {e}")),
        }
    }

    async fn verify(&self) -> VerifyResult {
        match self
            .client
            .get(self.url("/domains"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => VerifyResult::ok(),
            Ok(resp) => VerifyResult::failed(vendor::read_failure("Resend", resp).await),
            Err(e) => VerifyResult::failed(format!("Resend request failed: {e}")),
        }
    }
}
