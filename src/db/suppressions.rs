use sqlx::PgPool;
use uuid::Uuid;

use crate::models::EmailSuppression;

pub async fn is_suppressed(
    pool: &PgPool,
    organization_id: Uuid,
    email: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
           SELECT 1 FROM email_suppressions
           WHERE organization_id = $1 AND email = lower($2) AND is_active
         )",
    )
    .bind(organization_id)
    .bind(email.trim())
    .fetch_one(pool)
    .await
}

pub async fn list_by_org(
    pool: &PgPool,
    organization_id: Uuid,
) -> Result<Vec<EmailSuppression>, sqlx::Error> {
    sqlx::query_as::<_, EmailSuppression>(
        "SELECT * FROM email_suppressions WHERE organization_id = $1 AND is_active
         ORDER BY created_at DESC",
    )
    .bind(organization_id)
    .fetch_all(pool)
    .await
}

/// Suppress an address, reactivating an earlier entry if one exists.
pub async fn upsert(
    pool: &PgPool,
    organization_id: Uuid,
    email: &str,
    reason: &str,
) -> Result<EmailSuppression, sqlx::Error> {
    sqlx::query_as::<_, EmailSuppression>(
        "INSERT INTO email_suppressions (organization_id, email, reason)
         VALUES ($1, lower($2), $3)
         ON CONFLICT (organization_id, email) DO UPDATE SET
           reason = EXCLUDED.reason,
           is_active = true
         RETURNING *",
    )
    .bind(organization_id)
    .bind(email.trim())
    .bind(reason)
    .fetch_one(pool)
    .await
}

pub async fn deactivate(
    pool: &PgPool,
    organization_id: Uuid,
    email: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE email_suppressions SET is_active = false
         WHERE organization_id = $1 AND email = lower($2) AND is_active",
    )
    .bind(organization_id)
    .bind(email.trim())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
