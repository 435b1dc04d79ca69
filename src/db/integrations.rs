use sqlx::PgPool;
use uuid::Uuid;

use crate::models::OrganizationIntegrationConfig;

pub async fn list_by_org(
    pool: &PgPool,
    organization_id: Uuid,
) -> Result<Vec<OrganizationIntegrationConfig>, sqlx::Error> {
    sqlx::query_as::<_, OrganizationIntegrationConfig>(
        "SELECT * FROM organization_integrations WHERE organization_id = $1 ORDER BY provider",
    )
    .bind(organization_id)
    .fetch_all(pool)
    .await
}

pub async fn find(
    pool: &PgPool,
    organization_id: Uuid,
    provider: &str,
) -> Result<Option<OrganizationIntegrationConfig>, sqlx::Error> {
    sqlx::query_as::<_, OrganizationIntegrationConfig>(
        "SELECT * FROM organization_integrations WHERE organization_id = $1 AND provider = $2",
    )
    .bind(organization_id)
    .bind(provider)
    .fetch_optional(pool)
    .await
}

/// The enabled integration to use when the caller did not name one:
/// the default if enabled, otherwise the most recently verified.
pub async fn find_preferred_enabled(
    pool: &PgPool,
    organization_id: Uuid,
) -> Result<Option<OrganizationIntegrationConfig>, sqlx::Error> {
    sqlx::query_as::<_, OrganizationIntegrationConfig>(
        "SELECT * FROM organization_integrations
         WHERE organization_id = $1 AND is_enabled
         ORDER BY is_default DESC, last_verified_at DESC NULLS LAST, created_at
         LIMIT 1",
    )
    .bind(organization_id)
    .fetch_optional(pool)
    .await
}

/// Saving new credentials resets verification.
pub async fn upsert(
    pool: &PgPool,
    organization_id: Uuid,
    provider: &str,
    credentials_enc: &[u8],
) -> Result<OrganizationIntegrationConfig, sqlx::Error> {
    sqlx::query_as::<_, OrganizationIntegrationConfig>(
        "INSERT INTO organization_integrations (organization_id, provider, credentials_enc)
         VALUES ($1, $2, $3)
         ON CONFLICT (organization_id, provider) DO UPDATE SET
           credentials_enc = EXCLUDED.credentials_enc,
           is_verified = false,
           last_verified_at = NULL,
           updated_at = now()
         RETURNING *",
    )
    .bind(organization_id)
    .bind(provider)
    .bind(credentials_enc)
    .fetch_one(pool)
    .await
}

/// Replace stored credentials without touching verification state
/// (used after a token refresh).
pub async fn update_credentials(
    pool: &PgPool,
    id: Uuid,
    credentials_enc: &[u8],
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE organization_integrations SET credentials_enc = $2, updated_at = now() WHERE id = $1",
    )
    .bind(id)
    .bind(credentials_enc)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn record_verification(
    pool: &PgPool,
    id: Uuid,
    verified: bool,
    metadata: &serde_json::Value,
) -> Result<OrganizationIntegrationConfig, sqlx::Error> {
    sqlx::query_as::<_, OrganizationIntegrationConfig>(
        "UPDATE organization_integrations SET
           is_verified = $2,
           last_verified_at = CASE WHEN $2 THEN now() ELSE last_verified_at END,
           metadata = metadata || $3,
           updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(verified)
    .bind(metadata)
    .fetch_one(pool)
    .await
}

pub async fn set_enabled(
    pool: &PgPool,
    organization_id: Uuid,
    provider: &str,
    enabled: bool,
) -> Result<Option<OrganizationIntegrationConfig>, sqlx::Error> {
    sqlx::query_as::<_, OrganizationIntegrationConfig>(
        "UPDATE organization_integrations SET
           is_enabled = $3,
           is_default = CASE WHEN $3 THEN is_default ELSE false END,
           updated_at = now()
         WHERE organization_id = $1 AND provider = $2 RETURNING *",
    )
    .bind(organization_id)
    .bind(provider)
    .bind(enabled)
    .fetch_optional(pool)
    .await
}

/// Make one integration the org default, clearing the flag on the others.
/// The org's rows are locked first so concurrent calls serialize instead of
/// tripping the one-default index.
pub async fn set_default(
    pool: &PgPool,
    organization_id: Uuid,
    provider: &str,
) -> Result<Option<OrganizationIntegrationConfig>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT id FROM organization_integrations WHERE organization_id = $1 FOR UPDATE")
        .bind(organization_id)
        .fetch_all(&mut *tx)
        .await?;

    sqlx::query(
        "UPDATE organization_integrations SET is_default = false, updated_at = now()
         WHERE organization_id = $1 AND provider <> $2 AND is_default",
    )
    .bind(organization_id)
    .bind(provider)
    .execute(&mut *tx)
    .await?;

    let row = sqlx::query_as::<_, OrganizationIntegrationConfig>(
        "UPDATE organization_integrations SET is_default = true, updated_at = now()
         WHERE organization_id = $1 AND provider = $2 RETURNING *",
    )
    .bind(organization_id)
    .bind(provider)
    .fetch_optional(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

pub async fn delete(
    pool: &PgPool,
    organization_id: Uuid,
    provider: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM organization_integrations WHERE organization_id = $1 AND provider = $2",
    )
    .bind(organization_id)
    .bind(provider)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
