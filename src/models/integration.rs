use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row per (organization, meeting provider). `credentials_enc` holds an
/// encrypted `MeetingCredentials` record.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct OrganizationIntegrationConfig {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub provider: String,
    #[serde(skip_serializing)]
    pub credentials_enc: Vec<u8>,
    pub is_enabled: bool,
    pub is_verified: bool,
    pub is_default: bool,
    pub metadata: serde_json::Value,
    pub last_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
