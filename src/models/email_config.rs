use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-organization email vendor selection. `credentials_enc` holds an
/// encrypted `EmailCredentials` record.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct EmailProviderConfig {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub provider: String,
    #[serde(skip_serializing)]
    pub credentials_enc: Vec<u8>,
    pub from_email: String,
    pub from_name: Option<String>,
    pub reply_to: Option<String>,
    pub track_opens: bool,
    pub track_clicks: bool,
    pub is_enabled: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
