use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::providers::{
    GoogleConfig, GoogleProvider, MicrosoftConfig, MicrosoftProvider, ZoomConfig, ZoomProvider,
};
use super::{MeetingProvider, MeetingProviderKind, OAuthToken};
use crate::config::VendorEndpoints;
use crate::crypto::{self, mask_secret};
use crate::error::IntegrationError;
use crate::models::OrganizationIntegrationConfig;

fn primary_calendar() -> String {
    "primary".to_string()
}

/// Secret part of a meeting integration, stored encrypted. The cached
/// access token travels with the credentials it was issued for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum MeetingCredentials {
    Zoom {
        account_id: String,
        client_id: String,
        client_secret: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<OAuthToken>,
    },
    Microsoft {
        tenant_id: String,
        client_id: String,
        client_secret: String,
        organizer_user_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<OAuthToken>,
    },
    Google {
        client_id: String,
        client_secret: String,
        refresh_token: String,
        #[serde(default = "primary_calendar")]
        calendar_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<OAuthToken>,
    },
}

impl MeetingCredentials {
    pub fn kind(&self) -> MeetingProviderKind {
        match self {
            MeetingCredentials::Zoom { .. } => MeetingProviderKind::Zoom,
            MeetingCredentials::Microsoft { .. } => MeetingProviderKind::Microsoft,
            MeetingCredentials::Google { .. } => MeetingProviderKind::Google,
        }
    }

    pub fn token(&self) -> Option<&OAuthToken> {
        match self {
            MeetingCredentials::Zoom { token, .. }
            | MeetingCredentials::Microsoft { token, .. }
            | MeetingCredentials::Google { token, .. } => token.as_ref(),
        }
    }

    /// Store a freshly issued token. A rotated Google refresh token
    /// replaces the stored one.
    pub fn set_token(&mut self, new_token: OAuthToken) {
        match self {
            MeetingCredentials::Zoom { token, .. } | MeetingCredentials::Microsoft { token, .. } => {
                *token = Some(new_token);
            }
            MeetingCredentials::Google {
                token,
                refresh_token,
                ..
            } => {
                if let Some(rotated) = new_token.refresh_token.as_ref().filter(|r| !r.is_empty()) {
                    refresh_token.clone_from(rotated);
                }
                *token = Some(new_token);
            }
        }
    }

    pub fn masked(&self) -> serde_json::Value {
        match self {
            MeetingCredentials::Zoom {
                account_id,
                client_id,
                client_secret,
                ..
            } => json!({
                "account_id": account_id,
                "client_id": client_id,
                "client_secret": mask_secret(client_secret),
            }),
            MeetingCredentials::Microsoft {
                tenant_id,
                client_id,
                client_secret,
                organizer_user_id,
                ..
            } => json!({
                "tenant_id": tenant_id,
                "client_id": client_id,
                "client_secret": mask_secret(client_secret),
                "organizer_user_id": organizer_user_id,
            }),
            MeetingCredentials::Google {
                client_id,
                client_secret,
                refresh_token,
                calendar_id,
                ..
            } => json!({
                "client_id": client_id,
                "client_secret": mask_secret(client_secret),
                "refresh_token": mask_secret(refresh_token),
                "calendar_id": calendar_id,
            }),
        }
    }

    /// Parse admin input. Any cached token in the input is discarded.
    pub fn from_request(
        provider: MeetingProviderKind,
        fields: serde_json::Value,
    ) -> Result<Self, IntegrationError> {
        let serde_json::Value::Object(mut map) = fields else {
            return Err(IntegrationError::InvalidConfig(
                "credentials must be an object".to_string(),
            ));
        };
        map.remove("token");
        map.insert("provider".to_string(), json!(provider.as_str()));
        serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| IntegrationError::InvalidConfig(e.to_string()))
    }
}

pub fn decrypt_meeting_credentials(
    row: &OrganizationIntegrationConfig,
    encryption_key: &str,
) -> Result<MeetingCredentials, IntegrationError> {
    let kind: MeetingProviderKind = row
        .provider
        .parse()
        .map_err(IntegrationError::InvalidConfig)?;
    let credentials: MeetingCredentials =
        crypto::decrypt_credentials(&row.credentials_enc, encryption_key)?;

    if credentials.kind() != kind {
        return Err(IntegrationError::InvalidConfig(format!(
            "stored credentials are for {}, not {kind}",
            credentials.kind()
        )));
    }
    Ok(credentials)
}

pub fn provider_from_credentials(
    credentials: &MeetingCredentials,
    endpoints: &VendorEndpoints,
    client: &Client,
) -> Result<Box<dyn MeetingProvider>, IntegrationError> {
    let provider: Box<dyn MeetingProvider> = match credentials {
        MeetingCredentials::Zoom {
            account_id,
            client_id,
            client_secret,
            ..
        } => Box::new(ZoomProvider::new(
            ZoomConfig {
                account_id: account_id.clone(),
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                oauth_url: endpoints.zoom_oauth.clone(),
                api_url: endpoints.zoom_api.clone(),
            },
            client.clone(),
        )?),
        MeetingCredentials::Microsoft {
            tenant_id,
            client_id,
            client_secret,
            organizer_user_id,
            ..
        } => Box::new(MicrosoftProvider::new(
            MicrosoftConfig {
                tenant_id: tenant_id.clone(),
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                organizer_user_id: organizer_user_id.clone(),
                login_url: endpoints.microsoft_login.clone(),
                graph_url: endpoints.microsoft_graph.clone(),
            },
            client.clone(),
        )?),
        MeetingCredentials::Google {
            client_id,
            client_secret,
            refresh_token,
            calendar_id,
            ..
        } => Box::new(GoogleProvider::new(
            GoogleConfig {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                refresh_token: refresh_token.clone(),
                calendar_id: calendar_id.clone(),
                oauth_url: endpoints.google_oauth.clone(),
                calendar_url: endpoints.google_calendar.clone(),
            },
            client.clone(),
        )?),
    };
    Ok(provider)
}

/// Build the adapter for a stored integration row. Fails closed with `None`.
pub fn build_meeting_provider(
    row: &OrganizationIntegrationConfig,
    encryption_key: &str,
    endpoints: &VendorEndpoints,
    client: &Client,
) -> Option<Box<dyn MeetingProvider>> {
    let built = decrypt_meeting_credentials(row, encryption_key)
        .and_then(|credentials| provider_from_credentials(&credentials, endpoints, client));

    match built {
        Ok(provider) => Some(provider),
        Err(e) => {
            tracing::warn!(
                organization_id = %row.organization_id,
                provider = %row.provider,
                error = %e,
                "Meeting integration configuration unusable"
            );
            None
        }
    }
}
