use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::providers::{
    MailgunConfig, MailgunProvider, ResendConfig, ResendProvider, SendGridConfig,
    SendGridProvider, SmtpConfig, SmtpProvider, TlsMode,
};
use super::{EmailProvider, EmailProviderKind, Sender};
use crate::config::VendorEndpoints;
use crate::crypto::{self, mask_secret};
use crate::error::IntegrationError;
use crate::models::EmailProviderConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailgunRegion {
    #[default]
    Us,
    Eu,
}

/// Secret part of an email configuration, stored encrypted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum EmailCredentials {
    Resend {
        api_key: String,
    },
    Smtp {
        host: String,
        port: u16,
        username: String,
        password: String,
        #[serde(default)]
        tls_mode: TlsMode,
    },
    Sendgrid {
        api_key: String,
    },
    Mailgun {
        api_key: String,
        domain: String,
        #[serde(default)]
        region: MailgunRegion,
    },
}

impl EmailCredentials {
    pub fn kind(&self) -> EmailProviderKind {
        match self {
            EmailCredentials::Resend { .. } => EmailProviderKind::Resend,
            EmailCredentials::Smtp { .. } => EmailProviderKind::Smtp,
            EmailCredentials::Sendgrid { .. } => EmailProviderKind::Sendgrid,
            EmailCredentials::Mailgun { .. } => EmailProviderKind::Mailgun,
        }
    }

    /// Display form with secrets masked.
    pub fn masked(&self) -> serde_json::Value {
        match self {
            EmailCredentials::Resend { api_key } | EmailCredentials::Sendgrid { api_key } => {
                json!({ "api_key": mask_secret(api_key) })
            }
            EmailCredentials::Smtp {
                host,
                port,
                username,
                tls_mode,
                ..
            } => json!({
                "host": host,
                "port": port,
                "username": username,
                "password": "********",
                "tls_mode": tls_mode,
            }),
            EmailCredentials::Mailgun {
                api_key,
                domain,
                region,
            } => json!({
                "api_key": mask_secret(api_key),
                "domain": domain,
                "region": region,
            }),
        }
    }

    /// Parse admin input: a JSON object of provider-specific fields.
    pub fn from_request(
        provider: EmailProviderKind,
        fields: serde_json::Value,
    ) -> Result<Self, IntegrationError> {
        let serde_json::Value::Object(mut map) = fields else {
            return Err(IntegrationError::InvalidConfig(
                "credentials must be an object".to_string(),
            ));
        };
        map.insert("provider".to_string(), json!(provider.as_str()));
        serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| IntegrationError::InvalidConfig(e.to_string()))
    }
}

/// Decrypt a stored row's credentials, checking they belong to its provider.
pub fn decrypt_email_credentials(
    config: &EmailProviderConfig,
    encryption_key: &str,
) -> Result<EmailCredentials, IntegrationError> {
    let kind: EmailProviderKind = config
        .provider
        .parse()
        .map_err(IntegrationError::InvalidConfig)?;
    let credentials: EmailCredentials =
        crypto::decrypt_credentials(&config.credentials_enc, encryption_key)?;

    if credentials.kind() != kind {
        return Err(IntegrationError::InvalidConfig(format!(
            "stored credentials are for {}, not {kind}",
            credentials.kind()
        )));
    }
    Ok(credentials)
}

pub fn sender_of(config: &EmailProviderConfig) -> Sender {
    Sender {
        email: config.from_email.clone(),
        name: config.from_name.clone(),
        reply_to: config.reply_to.clone(),
    }
}

/// Instantiate the adapter matching a credential record.
pub fn provider_from_credentials(
    credentials: EmailCredentials,
    sender: Sender,
    endpoints: &VendorEndpoints,
    client: &Client,
) -> Result<Box<dyn EmailProvider>, IntegrationError> {
    let provider: Box<dyn EmailProvider> = match credentials {
        EmailCredentials::Resend { api_key } => Box::new(ResendProvider::new(
            ResendConfig {
                api_key,
                sender,
                api_url: endpoints.resend.clone(),
            },
            client.clone(),
        )?),
        EmailCredentials::Sendgrid { api_key } => Box::new(SendGridProvider::new(
            SendGridConfig {
                api_key,
                sender,
                api_url: endpoints.sendgrid.clone(),
            },
            client.clone(),
        )?),
        EmailCredentials::Mailgun {
            api_key,
            domain,
            region,
        } => Box::new(MailgunProvider::new(
            MailgunConfig {
                api_key,
                domain,
                sender,
                api_url: match region {
                    MailgunRegion::Us => endpoints.mailgun.clone(),
                    MailgunRegion::Eu => endpoints.mailgun_eu.clone(),
                },
            },
            client.clone(),
        )?),
        EmailCredentials::Smtp {
            host,
            port,
            username,
            password,
            tls_mode,
        } => Box::new(SmtpProvider::new(SmtpConfig {
            host,
            port,
            username,
            password,
            tls_mode,
            sender,
        })?),
    };
    Ok(provider)
}

/// Build the provider for a stored configuration. Fails closed: any
/// decryption or completeness problem is logged and yields `None`.
pub fn build_email_provider(
    config: &EmailProviderConfig,
    encryption_key: &str,
    endpoints: &VendorEndpoints,
    client: &Client,
) -> Option<Box<dyn EmailProvider>> {
    let built = decrypt_email_credentials(config, encryption_key).and_then(|credentials| {
        provider_from_credentials(credentials, sender_of(config), endpoints, client)
    });

    match built {
        Ok(provider) => Some(provider),
        Err(e) => {
            tracing::warn!(
                organization_id = %config.organization_id,
                provider = %config.provider,
                error = %e,
                "Email provider configuration unusable"
            );
            None
        }
    }
}
