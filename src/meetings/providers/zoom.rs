use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{IntegrationError, require};
use crate::meetings::{
    CreateMeetingOptions, MeetingDetails, MeetingProvider, MeetingProviderKind, MeetingResult,
    OAuthToken, read_token,
};
use crate::vendor::{self, VerifyResult};

/// Zoom server-to-server OAuth app credentials.
#[derive(Debug, Clone)]
pub struct ZoomConfig {
    pub account_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub oauth_url: String,
    pub api_url: String,
}

pub struct ZoomProvider {
    config: ZoomConfig,
    client: Client,
}

impl ZoomProvider {
    pub fn new(config: ZoomConfig, client: Client) -> Result<Self, IntegrationError> {
        require(&config.account_id, "account_id")?;
        require(&config.client_id, "client_id")?;
        require(&config.client_secret, "client_secret")?;
        Ok(Self { config, client })
    }

    fn api(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct ZoomMeeting {
    id: serde_json::Value,
    join_url: String,
    #[serde(default)]
    start_url: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ZoomUser {
    #[serde(default)]
    email: Option<String>,
}

#[async_trait]
impl MeetingProvider for ZoomProvider {
    fn kind(&self) -> MeetingProviderKind {
        MeetingProviderKind::Zoom
    }

    async fn refresh_token(&self) -> Result<OAuthToken, IntegrationError> {
        let resp = self
            .client
            .post(format!("{}/oauth/token", self.config.oauth_url.trim_end_matches('/')))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .query(&[
                ("grant_type", "account_credentials"),
                ("account_id", self.config.account_id.trim()),
            ])
            .send()
            .await?;
        read_token("Zoom", resp).await
    }

    async fn create_meeting(&self, access_token: &str, options: &CreateMeetingOptions) -> MeetingResult {
        if let Err(e) = options.validate() {
            return MeetingResult::failed(e);
        }

        let body = json!({
            "topic": options.topic,
            "type": 2,
            "start_time": options.start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            "duration": options.duration_minutes,
            "timezone": options.timezone(),
            "agenda": options.agenda.as_deref().unwrap_or_default(),
            "settings": {
                "join_before_host": false,
                "waiting_room": true,
                "meeting_invitees": options
                    .attendees
                    .iter()
                    .map(|email| json!({ "email": email }))
                    .collect::<Vec<_>>(),
            },
        });

        debug!(topic = %options.topic, "Creating Zoom meeting");

        let resp = match self
            .client
            .post(self.api("/v2/users/me/meetings"))
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return MeetingResult::failed(format!("Zoom request failed: {e}")),
        };

        if !resp.status().is_success() {
            let error = vendor::read_failure("Zoom", resp).await;
            warn!(%error, "Zoom rejected meeting");
            return MeetingResult::failed(error);
        }

        match resp.json::<ZoomMeeting>().await {
            Ok(meeting) => MeetingResult::created(MeetingDetails {
                provider: MeetingProviderKind::Zoom,
                meeting_id: match meeting.id {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                },
                join_url: meeting.join_url,
                host_url: meeting.start_url,
                passcode: meeting.password.filter(|p| !p.is_empty()),
                start_time: options.start_time,
                duration_minutes: options.duration_minutes,
            }),
            Err(e) => MeetingResult::failed(format!("Zoom returned an unexpected response: {e}")),
        }
    }

    async fn verify(&self) -> VerifyResult {
        let token = match self.refresh_token().await {
            Ok(token) => token,
            Err(e) => return VerifyResult::failed(e.to_string()),
        };

        match self
            .client
            .get(self.api("/v2/users/me"))
            .bearer_auth(&token.access_token)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                let user = resp.json::<ZoomUser>().await.ok();
                VerifyResult::ok_with_account(user.and_then(|u| u.email))
            }
            Ok(resp) => VerifyResult::failed(vendor::read_failure("Zoom", resp).await),
            Err(e) => VerifyResult::failed(format!("Zoom request failed: {e}")),
        }
    }
}
