use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::factory;
use super::{CreateMeetingOptions, MeetingProviderKind, MeetingResult};
use crate::config::Config;
use crate::crypto;
use crate::db;
use crate::models::OrganizationIntegrationConfig;

pub const NOT_CONFIGURED: &str = "Meeting integration not configured";

/// Persistence the meeting facade needs. Implemented for `PgPool`.
#[async_trait]
pub trait IntegrationStore: Send + Sync {
    /// The enabled integration for `provider`, or the org's preferred one.
    async fn enabled_integration(
        &self,
        organization_id: Uuid,
        provider: Option<MeetingProviderKind>,
    ) -> Result<Option<OrganizationIntegrationConfig>, sqlx::Error>;

    async fn store_credentials(&self, id: Uuid, credentials_enc: &[u8]) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl IntegrationStore for PgPool {
    async fn enabled_integration(
        &self,
        organization_id: Uuid,
        provider: Option<MeetingProviderKind>,
    ) -> Result<Option<OrganizationIntegrationConfig>, sqlx::Error> {
        match provider {
            Some(kind) => Ok(db::integrations::find(self, organization_id, kind.as_str())
                .await?
                .filter(|row| row.is_enabled)),
            None => db::integrations::find_preferred_enabled(self, organization_id).await,
        }
    }

    async fn store_credentials(&self, id: Uuid, credentials_enc: &[u8]) -> Result<(), sqlx::Error> {
        db::integrations::update_credentials(self, id, credentials_enc).await
    }
}

/// Schedules meetings through an organization's conferencing integration.
pub struct OrgMeetings<'a, S: IntegrationStore + ?Sized> {
    store: &'a S,
    client: &'a Client,
    config: &'a Config,
}

impl<'a, S: IntegrationStore + ?Sized> OrgMeetings<'a, S> {
    pub fn new(store: &'a S, client: &'a Client, config: &'a Config) -> Self {
        Self {
            store,
            client,
            config,
        }
    }

    pub async fn create_org_meeting(
        &self,
        organization_id: Uuid,
        provider: Option<MeetingProviderKind>,
        options: &CreateMeetingOptions,
    ) -> MeetingResult {
        if let Err(e) = options.validate() {
            return MeetingResult::failed(e);
        }

        let row = match self.store.enabled_integration(organization_id, provider).await {
            Ok(Some(row)) => row,
            Ok(None) => return MeetingResult::failed(NOT_CONFIGURED),
            Err(e) => {
                error!(%organization_id, error = %e, "Failed to load meeting integration");
                return MeetingResult::failed(NOT_CONFIGURED);
            }
        };

        let key = &self.config.encryption_key;
        let built = factory::decrypt_meeting_credentials(&row, key).and_then(|credentials| {
            factory::provider_from_credentials(&credentials, &self.config.endpoints, self.client)
                .map(|adapter| (credentials, adapter))
        });
        let (mut credentials, adapter) = match built {
            Ok(built) => built,
            Err(e) => {
                warn!(%organization_id, provider = %row.provider, error = %e, "Meeting integration unusable");
                return MeetingResult::failed(NOT_CONFIGURED);
            }
        };

        let cached = credentials
            .token()
            .filter(|t| t.is_fresh(Utc::now()))
            .map(|t| t.access_token.clone());

        let access_token = match cached {
            Some(token) => token,
            None => {
                let token = match adapter.refresh_token().await {
                    Ok(token) => token,
                    Err(e) => {
                        warn!(%organization_id, provider = %adapter.kind(), error = %e, "Token refresh failed");
                        return MeetingResult::failed(e.to_string());
                    }
                };
                let access_token = token.access_token.clone();
                credentials.set_token(token);

                // Best-effort: the next call refreshes again if this is lost.
                match crypto::encrypt_credentials(&credentials, key) {
                    Ok(enc) => {
                        if let Err(e) = self.store.store_credentials(row.id, &enc).await {
                            warn!(integration_id = %row.id, error = %e, "Failed to persist refreshed token");
                        }
                    }
                    Err(e) => warn!(integration_id = %row.id, error = %e, "Failed to encrypt refreshed token"),
                }
                access_token
            }
        };

        let result = adapter.create_meeting(&access_token, options).await;
        if let Some(meeting) = &result.meeting {
            info!(%organization_id, provider = %adapter.kind(), meeting_id = %meeting.meeting_id, "Meeting created");
        }
        result
    }
}
