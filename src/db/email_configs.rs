use sqlx::PgPool;
use uuid::Uuid;

use crate::models::EmailProviderConfig;

pub async fn find_by_org(
    pool: &PgPool,
    organization_id: Uuid,
) -> Result<Option<EmailProviderConfig>, sqlx::Error> {
    sqlx::query_as::<_, EmailProviderConfig>(
        "SELECT * FROM organization_email_configs WHERE organization_id = $1",
    )
    .bind(organization_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_enabled_by_org(
    pool: &PgPool,
    organization_id: Uuid,
) -> Result<Option<EmailProviderConfig>, sqlx::Error> {
    sqlx::query_as::<_, EmailProviderConfig>(
        "SELECT * FROM organization_email_configs WHERE organization_id = $1 AND is_enabled",
    )
    .bind(organization_id)
    .fetch_optional(pool)
    .await
}

pub struct UpsertEmailConfig<'a> {
    pub provider: &'a str,
    pub credentials_enc: &'a [u8],
    pub from_email: &'a str,
    pub from_name: Option<&'a str>,
    pub reply_to: Option<&'a str>,
    pub track_opens: bool,
    pub track_clicks: bool,
}

/// Saving new credentials clears the verification timestamp.
pub async fn upsert(
    pool: &PgPool,
    organization_id: Uuid,
    config: &UpsertEmailConfig<'_>,
) -> Result<EmailProviderConfig, sqlx::Error> {
    sqlx::query_as::<_, EmailProviderConfig>(
        "INSERT INTO organization_email_configs
           (organization_id, provider, credentials_enc, from_email, from_name, reply_to, track_opens, track_clicks)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (organization_id) DO UPDATE SET
           provider = EXCLUDED.provider,
           credentials_enc = EXCLUDED.credentials_enc,
           from_email = EXCLUDED.from_email,
           from_name = EXCLUDED.from_name,
           reply_to = EXCLUDED.reply_to,
           track_opens = EXCLUDED.track_opens,
           track_clicks = EXCLUDED.track_clicks,
           verified_at = NULL,
           updated_at = now()
         RETURNING *",
    )
    .bind(organization_id)
    .bind(config.provider)
    .bind(config.credentials_enc)
    .bind(config.from_email)
    .bind(config.from_name)
    .bind(config.reply_to)
    .bind(config.track_opens)
    .bind(config.track_clicks)
    .fetch_one(pool)
    .await
}

pub async fn set_enabled(
    pool: &PgPool,
    organization_id: Uuid,
    enabled: bool,
) -> Result<Option<EmailProviderConfig>, sqlx::Error> {
    sqlx::query_as::<_, EmailProviderConfig>(
        "UPDATE organization_email_configs SET is_enabled = $2, updated_at = now()
         WHERE organization_id = $1 RETURNING *",
    )
    .bind(organization_id)
    .bind(enabled)
    .fetch_optional(pool)
    .await
}

pub async fn mark_verified(pool: &PgPool, organization_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE organization_email_configs SET verified_at = now(), updated_at = now()
         WHERE organization_id = $1",
    )
    .bind(organization_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete(pool: &PgPool, organization_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM organization_email_configs WHERE organization_id = $1")
        .bind(organization_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
