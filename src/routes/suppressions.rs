use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::json;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::EmailSuppression;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct SuppressRequest {
    pub email: String,
    pub reason: Option<String>,
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<EmailSuppression>>, AppError> {
    let rows = db::suppressions::list_by_org(&state.pool, auth.org_id()).await?;
    Ok(Json(rows))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<SuppressRequest>,
) -> Result<Json<EmailSuppression>, AppError> {
    auth.require_admin()?;

    let email = req.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("A valid email address is required".to_string()));
    }
    let reason = req
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or("manual");

    let row = db::suppressions::upsert(&state.pool, auth.org_id(), email, reason).await?;

    audit::log_event(
        &state.pool,
        &auth,
        "suppression.added",
        "email_suppression",
        Some(row.email.as_str()),
        Some(json!({ "reason": reason })),
    )
    .await;

    Ok(Json(row))
}

pub async fn remove(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(email): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    let email = email.trim().to_lowercase();
    if !db::suppressions::deactivate(&state.pool, auth.org_id(), &email).await? {
        return Err(AppError::NotFound("Address is not suppressed".to_string()));
    }

    audit::log_event(
        &state.pool,
        &auth,
        "suppression.removed",
        "email_suppression",
        Some(email.as_str()),
        None,
    )
    .await;

    Ok(Json(json!({ "message": "Suppression removed" })))
}
