pub mod factory;
pub mod providers;
pub mod service;

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IntegrationError;
use crate::vendor::{self, VerifyResult};

/// Tokens are refreshed when they have less than this left.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;
/// Upper bound on a vendor-reported `expires_in`.
const MAX_TOKEN_LIFETIME_SECS: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingProviderKind {
    Zoom,
    Microsoft,
    Google,
}

impl MeetingProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingProviderKind::Zoom => "zoom",
            MeetingProviderKind::Microsoft => "microsoft",
            MeetingProviderKind::Google => "google",
        }
    }
}

impl FromStr for MeetingProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zoom" => Ok(MeetingProviderKind::Zoom),
            "microsoft" => Ok(MeetingProviderKind::Microsoft),
            "google" => Ok(MeetingProviderKind::Google),
            other => Err(format!("Unknown meeting provider: {other}")),
        }
    }
}

impl std::fmt::Display for MeetingProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl OAuthToken {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS) > now
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Turn an OAuth token endpoint response into a token, or a vendor error.
pub(crate) async fn read_token(
    vendor_name: &str,
    resp: reqwest::Response,
) -> Result<OAuthToken, IntegrationError> {
    let status = resp.status();
    if !status.is_success() {
        let message = vendor::read_failure(vendor_name, resp).await;
        return Err(IntegrationError::Vendor {
            status: status.as_u16(),
            message,
        });
    }

    let body: TokenResponse = resp.json().await?;
    if body.access_token.trim().is_empty() {
        return Err(IntegrationError::Vendor {
            status: status.as_u16(),
            message: format!("{vendor_name} returned an empty access token"),
        });
    }

    Ok(OAuthToken {
        access_token: body.access_token,
        refresh_token: body.refresh_token,
        expires_at: token_expiry(Utc::now(), body.expires_in),
    })
}

/// Vendor lifetimes are untrusted input; keep them within a day.
fn token_expiry(now: DateTime<Utc>, expires_in: Option<i64>) -> DateTime<Utc> {
    let secs = expires_in
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
        .clamp(0, MAX_TOKEN_LIFETIME_SECS);
    now + Duration::seconds(secs)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMeetingOptions {
    pub topic: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: u32,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub agenda: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
}

impl CreateMeetingOptions {
    pub fn validate(&self) -> Result<(), String> {
        if self.topic.trim().is_empty() {
            return Err("Meeting topic is required".to_string());
        }
        if self.duration_minutes == 0 {
            return Err("Meeting duration must be positive".to_string());
        }
        Ok(())
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn timezone(&self) -> &str {
        self.timezone
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("UTC")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeetingDetails {
    pub provider: MeetingProviderKind,
    pub meeting_id: String,
    pub join_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passcode: Option<String>,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeetingResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting: Option<MeetingDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MeetingResult {
    pub fn created(meeting: MeetingDetails) -> Self {
        Self {
            success: true,
            meeting: Some(meeting),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            meeting: None,
            error: Some(if error.trim().is_empty() {
                "Unknown error".to_string()
            } else {
                error
            }),
        }
    }
}

#[async_trait]
pub trait MeetingProvider: Send + Sync {
    fn kind(&self) -> MeetingProviderKind;

    /// Obtain a new access token from the vendor's OAuth endpoint.
    async fn refresh_token(&self) -> Result<OAuthToken, IntegrationError>;

    /// Schedule a meeting. Vendor failures come back as `success: false`.
    async fn create_meeting(&self, access_token: &str, options: &CreateMeetingOptions) -> MeetingResult;

    /// Refresh a token and make one authenticated read.
    async fn verify(&self) -> VerifyResult;
}
