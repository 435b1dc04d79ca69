use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;

/// Log an audit event. Called explicitly in handlers after mutations;
/// failures are traced, never surfaced.
pub async fn log_event(
    pool: &PgPool,
    auth: &AuthUser,
    action: &str,
    resource_type: &str,
    resource_id: Option<&str>,
    details: Option<serde_json::Value>,
) {
    if let Err(e) = crate::db::audit::log_event(
        pool,
        auth.org_id(),
        Some(auth.user_id),
        action,
        resource_type,
        resource_id,
        details,
    )
    .await
    {
        tracing::error!("Failed to log audit event: {e}");
    }
}
