use async_trait::async_trait;
use reqwest::Client;
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::tracking::{self, TrackingSettings};
use super::{EmailProvider, SendEmailOptions, SendEmailResult, factory};
use crate::config::Config;
use crate::db;
use crate::models::{EmailLogStatus, EmailProviderConfig, NewEmailLog};

pub const NOT_CONFIGURED: &str = "Email integration not configured";
pub const SUPPRESSED: &str = "suppressed";

/// Persistence the org mailer needs. Implemented for `PgPool`.
#[async_trait]
pub trait MailStore: Send + Sync {
    async fn enabled_email_config(
        &self,
        organization_id: Uuid,
    ) -> Result<Option<EmailProviderConfig>, sqlx::Error>;

    async fn is_suppressed(&self, organization_id: Uuid, email: &str) -> Result<bool, sqlx::Error>;

    async fn record_email_log(&self, entry: &NewEmailLog) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl MailStore for PgPool {
    async fn enabled_email_config(
        &self,
        organization_id: Uuid,
    ) -> Result<Option<EmailProviderConfig>, sqlx::Error> {
        db::email_configs::find_enabled_by_org(self, organization_id).await
    }

    async fn is_suppressed(&self, organization_id: Uuid, email: &str) -> Result<bool, sqlx::Error> {
        db::suppressions::is_suppressed(self, organization_id, email).await
    }

    async fn record_email_log(&self, entry: &NewEmailLog) -> Result<(), sqlx::Error> {
        db::email_logs::create(self, entry).await
    }
}

/// Sends mail on behalf of an organization through its configured vendor.
/// Built per request; holds borrowed handles only.
pub struct OrgMailer<'a, S: MailStore + ?Sized> {
    store: &'a S,
    client: &'a Client,
    config: &'a Config,
}

impl<'a, S: MailStore + ?Sized> OrgMailer<'a, S> {
    pub fn new(store: &'a S, client: &'a Client, config: &'a Config) -> Self {
        Self {
            store,
            client,
            config,
        }
    }

    pub async fn send_org_email(
        &self,
        organization_id: Uuid,
        options: SendEmailOptions,
    ) -> SendEmailResult {
        let email_config = match self.store.enabled_email_config(organization_id).await {
            Ok(Some(c)) => c,
            Ok(None) => return SendEmailResult::failed(NOT_CONFIGURED),
            Err(e) => {
                error!(%organization_id, error = %e, "Failed to load email config");
                return SendEmailResult::failed(NOT_CONFIGURED);
            }
        };

        let Some(provider) = factory::build_email_provider(
            &email_config,
            &self.config.encryption_key,
            &self.config.endpoints,
            self.client,
        ) else {
            return SendEmailResult::failed(NOT_CONFIGURED);
        };

        self.deliver(&email_config, provider.as_ref(), options).await
    }

    /// Suppression check, tracking, send and log through an already built
    /// provider. Used directly by the config test, which may run while the
    /// config is disabled.
    pub async fn deliver(
        &self,
        email_config: &EmailProviderConfig,
        provider: &dyn EmailProvider,
        mut options: SendEmailOptions,
    ) -> SendEmailResult {
        let organization_id = email_config.organization_id;
        let log_id = Uuid::now_v7();
        let mut log = NewEmailLog {
            id: log_id,
            organization_id,
            provider: Some(provider.kind().as_str().to_string()),
            to_email: options.recipients().collect::<Vec<_>>().join(", "),
            subject: options.subject.clone(),
            status: EmailLogStatus::Suppressed,
            message_id: None,
            error: None,
        };

        // Suppression is checked before spending a vendor call. Copies count too.
        for recipient in options.delivery_addresses() {
            match self.store.is_suppressed(organization_id, &recipient).await {
                Ok(false) => {}
                Ok(true) => {
                    info!(%organization_id, %recipient, "Recipient suppressed, skipping send");
                    log.error = Some(SUPPRESSED.to_string());
                    self.write_log(&log).await;
                    return SendEmailResult::failed(SUPPRESSED);
                }
                Err(e) => {
                    error!(%organization_id, error = %e, "Suppression check failed");
                    return SendEmailResult::failed("Could not check suppression list");
                }
            }
        }

        options.html = tracking::inject_tracking(
            &options.html,
            log_id,
            &TrackingSettings {
                base_url: self.config.public_base_url.as_deref(),
                track_opens: email_config.track_opens,
                track_clicks: email_config.track_clicks,
                signing_key: &self.config.encryption_key,
            },
        );

        let result = provider.send(&options).await;

        log.status = if result.success {
            EmailLogStatus::Sent
        } else {
            EmailLogStatus::Failed
        };
        log.message_id = result.message_id.clone();
        log.error = result.error.clone();
        self.write_log(&log).await;

        if result.success {
            info!(%organization_id, provider = %provider.kind(), message_id = ?result.message_id, "Email sent");
        } else {
            warn!(%organization_id, provider = %provider.kind(), error = ?result.error, "Email send failed");
        }

        result
    }

    /// Best-effort: a logging failure never changes the send outcome.
    async fn write_log(&self, entry: &NewEmailLog) {
        if let Err(e) = self.store.record_email_log(entry).await {
            warn!(log_id = %entry.id, error = %e, "Failed to record email log");
        }
    }
}
