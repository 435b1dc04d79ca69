use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct EmailSuppression {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub reason: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
