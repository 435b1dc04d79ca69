use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{IntegrationError, require};
use crate::meetings::{
    CreateMeetingOptions, MeetingDetails, MeetingProvider, MeetingProviderKind, MeetingResult,
    OAuthToken, read_token,
};
use crate::vendor::{self, VerifyResult};

/// Google OAuth client plus the offline refresh token granted by the
/// connected account. Meetings are Calendar events with a Meet link.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub calendar_id: String,
    pub oauth_url: String,
    pub calendar_url: String,
}

pub struct GoogleProvider {
    config: GoogleConfig,
    client: Client,
}

impl GoogleProvider {
    pub fn new(config: GoogleConfig, client: Client) -> Result<Self, IntegrationError> {
        require(&config.client_id, "client_id")?;
        require(&config.client_secret, "client_secret")?;
        require(&config.refresh_token, "refresh_token")?;
        require(&config.calendar_id, "calendar_id")?;
        Ok(Self { config, client })
    }

    fn calendar(&self, suffix: &str) -> String {
        let calendar: String =
            form_urlencoded::byte_serialize(self.config.calendar_id.trim().as_bytes()).collect();
        format!(
            "{}/calendar/v3/calendars/{calendar}{suffix}",
            self.config.calendar_url.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarEvent {
    id: String,
    #[serde(default)]
    hangout_link: Option<String>,
    #[serde(default)]
    html_link: Option<String>,
    #[serde(default)]
    conference_data: Option<ConferenceData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConferenceData {
    #[serde(default)]
    entry_points: Vec<EntryPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryPoint {
    entry_point_type: String,
    uri: String,
}

#[derive(Debug, Deserialize)]
struct Calendar {
    id: String,
}

impl CalendarEvent {
    fn join_url(&self) -> Option<String> {
        self.hangout_link
            .clone()
            .or_else(|| {
                self.conference_data.as_ref().and_then(|c| {
                    c.entry_points
                        .iter()
                        .find(|e| e.entry_point_type == "video")
                        .map(|e| e.uri.clone())
                })
            })
            .or_else(|| self.html_link.clone())
    }
}

#[async_trait]
impl MeetingProvider for GoogleProvider {
    fn kind(&self) -> MeetingProviderKind {
        MeetingProviderKind::Google
    }

    async fn refresh_token(&self) -> Result<OAuthToken, IntegrationError> {
        let resp = self
            .client
            .post(format!("{}/token", self.config.oauth_url.trim_end_matches('/')))
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", self.config.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;
        let mut token = read_token("Google", resp).await?;
        // Google rarely rotates the refresh token; keep ours when it doesn't.
        if token.refresh_token.is_none() {
            token.refresh_token = Some(self.config.refresh_token.clone());
        }
        Ok(token)
    }

    async fn create_meeting(&self, access_token: &str, options: &CreateMeetingOptions) -> MeetingResult {
        if let Err(e) = options.validate() {
            return MeetingResult::failed(e);
        }

        let attendees: Vec<_> = options
            .attendees
            .iter()
            .map(|email| json!({ "email": email }))
            .collect();

        let body = json!({
            "summary": options.topic,
            "description": options.agenda.as_deref().unwrap_or_default(),
            "start": {
                "dateTime": options.start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
                "timeZone": options.timezone(),
            },
            "end": {
                "dateTime": options.end_time().to_rfc3339_opts(SecondsFormat::Secs, true),
                "timeZone": options.timezone(),
            },
            "attendees": attendees,
            "conferenceData": {
                "createRequest": {
                    "requestId": Uuid::now_v7().to_string(),
                    "conferenceSolutionKey": { "type": "hangoutsMeet" },
                },
            },
        });

        debug!(topic = %options.topic, "Creating Google Calendar event");

        let resp = match self
            .client
            .post(self.calendar("/events"))
            .query(&[("conferenceDataVersion", "1"), ("sendUpdates", "all")])
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return MeetingResult::failed(format!("Google request failed: {e}")),
        };

        if !resp.status().is_success() {
            let error = vendor::read_failure("Google", resp).await;
            warn!(%error, "Google Calendar rejected event");
            return MeetingResult::failed(error);
        }

        match resp.json::<CalendarEvent>().await {
            Ok(event) => match event.join_url() {
                Some(join_url) => MeetingResult::created(MeetingDetails {
                    provider: MeetingProviderKind::Google,
                    meeting_id: event.id,
                    join_url,
                    host_url: event.html_link,
                    passcode: None,
                    start_time: options.start_time,
                    duration_minutes: options.duration_minutes,
                }),
                None => MeetingResult::failed("Google returned an event without a meeting link"),
            },
            Err(e) => MeetingResult::failed(format!("Google returned an unexpected response: {e}")),
        }
    }

    async fn verify(&self) -> VerifyResult {
        let token = match self.refresh_token().await {
            Ok(token) => token,
            Err(e) => return VerifyResult::failed(e.to_string()),
        };

        match self
            .client
            .get(self.calendar(""))
            .bearer_auth(&token.access_token)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                let calendar = resp.json::<Calendar>().await.ok();
                VerifyResult::ok_with_account(calendar.map(|c| c.id))
            }
            Ok(resp) => VerifyResult::failed(vendor::read_failure("Google", resp).await),
            Err(e) => VerifyResult::failed(format!("Google request failed: {e}")),
        }
    }
}
