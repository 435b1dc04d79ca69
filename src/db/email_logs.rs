use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{EmailLog, NewEmailLog};

pub async fn create(pool: &PgPool, entry: &NewEmailLog) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO email_logs (id, organization_id, provider, to_email, subject, status, message_id, error)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(entry.id)
    .bind(entry.organization_id)
    .bind(entry.provider.as_deref())
    .bind(&entry.to_email)
    .bind(&entry.subject)
    .bind(entry.status.as_str())
    .bind(entry.message_id.as_deref())
    .bind(entry.error.as_deref())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_by_org(
    pool: &PgPool,
    organization_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<EmailLog>, sqlx::Error> {
    sqlx::query_as::<_, EmailLog>(
        "SELECT * FROM email_logs WHERE organization_id = $1
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(organization_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn record_open(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE email_logs SET
           open_count = open_count + 1,
           first_opened_at = COALESCE(first_opened_at, now())
         WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn record_click(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE email_logs SET click_count = click_count + 1, last_clicked_at = now() WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}
