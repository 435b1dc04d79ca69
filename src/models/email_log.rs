use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct EmailLog {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub provider: Option<String>,
    pub to_email: String,
    pub subject: String,
    pub status: String,
    pub message_id: Option<String>,
    pub error: Option<String>,
    pub open_count: i32,
    pub click_count: i32,
    pub first_opened_at: Option<DateTime<Utc>>,
    pub last_clicked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailLogStatus {
    Sent,
    Failed,
    Suppressed,
}

impl EmailLogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailLogStatus::Sent => "sent",
            EmailLogStatus::Failed => "failed",
            EmailLogStatus::Suppressed => "suppressed",
        }
    }
}

/// Outcome of one send attempt, written after the vendor call.
#[derive(Debug, Clone)]
pub struct NewEmailLog {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub provider: Option<String>,
    pub to_email: String,
    pub subject: String,
    pub status: EmailLogStatus,
    pub message_id: Option<String>,
    pub error: Option<String>,
}
