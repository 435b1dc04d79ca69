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

const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Azure AD app registration with application permission to create
/// online meetings on behalf of `organizer_user_id`.
#[derive(Debug, Clone)]
pub struct MicrosoftConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub organizer_user_id: String,
    pub login_url: String,
    pub graph_url: String,
}

pub struct MicrosoftProvider {
    config: MicrosoftConfig,
    client: Client,
}

impl MicrosoftProvider {
    pub fn new(config: MicrosoftConfig, client: Client) -> Result<Self, IntegrationError> {
        require(&config.tenant_id, "tenant_id")?;
        require(&config.client_id, "client_id")?;
        require(&config.client_secret, "client_secret")?;
        require(&config.organizer_user_id, "organizer_user_id")?;
        Ok(Self { config, client })
    }

    fn user_url(&self, suffix: &str) -> String {
        let organizer: String =
            form_urlencoded::byte_serialize(self.config.organizer_user_id.trim().as_bytes()).collect();
        format!(
            "{}/v1.0/users/{organizer}{suffix}",
            self.config.graph_url.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OnlineMeeting {
    id: String,
    #[serde(default)]
    join_web_url: Option<String>,
    #[serde(default)]
    join_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphUser {
    #[serde(default)]
    mail: Option<String>,
    #[serde(default)]
    user_principal_name: Option<String>,
}

#[async_trait]
impl MeetingProvider for MicrosoftProvider {
    fn kind(&self) -> MeetingProviderKind {
        MeetingProviderKind::Microsoft
    }

    async fn refresh_token(&self) -> Result<OAuthToken, IntegrationError> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.config.login_url.trim_end_matches('/'),
            self.config.tenant_id.trim()
        );
        let resp = self
            .client
            .post(url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("scope", GRAPH_SCOPE),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;
        read_token("Microsoft", resp).await
    }

    async fn create_meeting(&self, access_token: &str, options: &CreateMeetingOptions) -> MeetingResult {
        if let Err(e) = options.validate() {
            return MeetingResult::failed(e);
        }

        let attendees: Vec<_> = options
            .attendees
            .iter()
            .map(|email| json!({ "upn": email, "role": "attendee" }))
            .collect();

        let body = json!({
            "subject": options.topic,
            "startDateTime": options.start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            "endDateTime": options.end_time().to_rfc3339_opts(SecondsFormat::Secs, true),
            "participants": { "attendees": attendees },
        });

        debug!(topic = %options.topic, "Creating Microsoft Teams meeting");

        let resp = match self
            .client
            .post(self.user_url("/onlineMeetings"))
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return MeetingResult::failed(format!("Microsoft request failed: {e}")),
        };

        if !resp.status().is_success() {
            let error = vendor::read_failure("Microsoft", resp).await;
            warn!(%error, "Microsoft Graph rejected meeting");
            return MeetingResult::failed(error);
        }

        match resp.json::<OnlineMeeting>().await {
            Ok(meeting) => match meeting.join_web_url.or(meeting.join_url) {
                Some(join_url) => MeetingResult::created(MeetingDetails {
                    provider: MeetingProviderKind::Microsoft,
                    meeting_id: meeting.id,
                    join_url,
                    host_url: None,
                    passcode: None,
                    start_time: options.start_time,
                    duration_minutes: options.duration_minutes,
                }),
                None => MeetingResult::failed("Microsoft returned a meeting without a join URL"),
            },
            Err(e) => MeetingResult::failed(format!("Microsoft returned an unexpected response: {e}")),
        }
    }

    async fn verify(&self) -> VerifyResult {
        let token = match self.refresh_token().await {
            Ok(token) => token,
            Err(e) => return VerifyResult::failed(e.to_string()),
        };

        match self
            .client
            .get(self.user_url(""))
            .bearer_auth(&token.access_token)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                let user = resp.json::<GraphUser>().await.ok();
                VerifyResult::ok_with_account(user.and_then(|u| u.mail.or(u.user_principal_name)))
            }
            Ok(resp) => VerifyResult::failed(vendor::read_failure("Microsoft", resp).await),
            Err(e) => VerifyResult::failed(format!("Microsoft request failed: {e}")),
        }
    }
}
