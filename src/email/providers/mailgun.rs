use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::email::{EmailProvider, EmailProviderKind, SendEmailOptions, SendEmailResult, Sender};
use crate::error::{IntegrationError, require};
use crate::vendor::{self, VerifyResult};

#[derive(Debug, Clone)]
pub struct MailgunConfig {
    pub api_key: String,
    pub domain: String,
    pub sender: Sender,
    /// Region-specific base URL (US or EU).
    pub api_url: String,
}

pub struct MailgunProvider {
    config: MailgunConfig,
    client: Client,
}

impl MailgunProvider {
    pub fn new(config: MailgunConfig, client: Client) -> Result<Self, IntegrationError> {
        require(&config.api_key, "api_key")?;
        require(&config.domain, "domain")?;
        require(&config.sender.email, "from_email")?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/v3/{}{path}",
            self.config.api_url.trim_end_matches('/'),
            self.config.domain.trim()
        )
    }
}

#[derive(Debug, Deserialize)]
struct MailgunResponse {
    id: String,
}

#[async_trait]
impl EmailProvider for MailgunProvider {
    fn kind(&self) -> EmailProviderKind {
        EmailProviderKind::Mailgun
    }

    async fn send(&self, options: &SendEmailOptions) -> SendEmailResult {
        if let Err(e) = options.validate() {
            return SendEmailResult::failed(e);
        }

        let mut form: Vec<(&str, String)> = vec![
            ("from", self.config.sender.from_for(options)),
            ("subject", options.subject.clone()),
        ];
        form.extend(options.recipients().map(|to| ("to", to.to_string())));
        form.extend(options.cc.iter().map(|cc| ("cc", cc.clone())));
        form.extend(options.bcc.iter().map(|bcc| ("bcc", bcc.clone())));
        if !options.html.trim().is_empty() {
            form.push(("html", options.html.clone()));
        }
        if let Some(text) = options.text.as_deref().filter(|t| !t.trim().is_empty()) {
            form.push(("text", text.to_string()));
        }
        if let Some(reply_to) = self.config.sender.reply_to_for(options) {
            form.push(("h:Reply-To", reply_to));
        }

        debug!(domain = %self.config.domain, subject = %options.subject, "Sending email via Mailgun");

        let resp = match self
            .client
            .post(self.url("/messages"))
            .basic_auth("api", Some(&self.config.api_key))
            .form(&form)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return SendEmailResult::failed(format!("Mailgun request failed: {e}")),
        };

        if !resp.status().is_success() {
            let error = vendor::read_failure("Mailgun", resp).await;
            warn!(%error, "Mailgun rejected email");
            return SendEmailResult::failed(error);
        }

        match resp.json::<MailgunResponse>().await {
            Ok(body) => SendEmailResult::sent(Some(body.id)),
            Err(e) => SendEmailResult::failed(format!("Mailgun returned an unexpected response: {e}")),
        }
    }

    async fn verify(&self) -> VerifyResult {
        let url = format!(
            "{}/v3/domains/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.domain.trim()
        );
        match self
            .client
            .get(url)
            .basic_auth("api", Some(&self.config.api_key))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                VerifyResult::ok_with_account(Some(self.config.domain.trim().to_string()))
            }
            Ok(resp) => VerifyResult::failed(vendor::read_failure("Mailgun", resp).await),
            Err(e) => VerifyResult::failed(format!("Mailgun request failed: {e}")),
        }
    }
}
