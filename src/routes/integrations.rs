use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::extractor::AuthUser;
use crate::crypto;
use crate::db;
use crate::error::AppError;
use crate::meetings::MeetingProviderKind;
use crate::meetings::factory::{self, MeetingCredentials};
use crate::middleware::audit;
use crate::models::OrganizationIntegrationConfig;
use crate::state::SharedState;
use crate::vendor::VerifyResult;

#[derive(Serialize)]
pub struct IntegrationView {
    #[serde(flatten)]
    pub integration: OrganizationIntegrationConfig,
    /// Masked credentials; `null` when the stored record cannot be read.
    pub credentials: Option<serde_json::Value>,
}

impl IntegrationView {
    fn new(integration: OrganizationIntegrationConfig, encryption_key: &str) -> Self {
        let credentials = match factory::decrypt_meeting_credentials(&integration, encryption_key) {
            Ok(c) => Some(c.masked()),
            Err(e) => {
                tracing::warn!(integration_id = %integration.id, error = %e, "Stored credentials unreadable");
                None
            }
        };
        Self {
            integration,
            credentials,
        }
    }
}

#[derive(Deserialize)]
pub struct SaveIntegration {
    pub credentials: serde_json::Value,
}

#[derive(Deserialize)]
pub struct ToggleRequest {
    pub enabled: bool,
}

fn parse_provider(raw: &str) -> Result<MeetingProviderKind, AppError> {
    raw.parse().map_err(AppError::BadRequest)
}

fn not_found() -> AppError {
    AppError::NotFound("Integration not found".to_string())
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<IntegrationView>>, AppError> {
    let rows = db::integrations::list_by_org(&state.pool, auth.org_id()).await?;
    let key = &state.config.encryption_key;
    Ok(Json(
        rows.into_iter()
            .map(|row| IntegrationView::new(row, key))
            .collect(),
    ))
}

pub async fn save(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(provider): Path<String>,
    Json(req): Json<SaveIntegration>,
) -> Result<Json<IntegrationView>, AppError> {
    auth.require_admin()?;
    let kind = parse_provider(&provider)?;

    let credentials = MeetingCredentials::from_request(kind, req.credentials)?;
    // Reject incomplete credentials before they are stored.
    factory::provider_from_credentials(&credentials, &state.config.endpoints, &state.http)?;

    let enc = crypto::encrypt_credentials(&credentials, &state.config.encryption_key)?;
    let row = db::integrations::upsert(&state.pool, auth.org_id(), kind.as_str(), &enc).await?;

    audit::log_event(
        &state.pool,
        &auth,
        "integration.saved",
        "integration",
        Some(kind.as_str()),
        None,
    )
    .await;

    Ok(Json(IntegrationView::new(row, &state.config.encryption_key)))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(provider): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;
    let kind = parse_provider(&provider)?;

    if !db::integrations::delete(&state.pool, auth.org_id(), kind.as_str()).await? {
        return Err(not_found());
    }

    audit::log_event(
        &state.pool,
        &auth,
        "integration.deleted",
        "integration",
        Some(kind.as_str()),
        None,
    )
    .await;

    Ok(Json(json!({ "message": "Integration removed" })))
}

/// Run the provider's verify call and record the outcome on the row.
pub async fn test(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(provider): Path<String>,
) -> Result<Json<VerifyResult>, AppError> {
    auth.require_admin()?;
    let kind = parse_provider(&provider)?;

    if let Err(retry_after) = state.verify_limiter.check(auth.org_id(), kind.as_str()) {
        return Err(AppError::RateLimited(format!(
            "Too many tests. Try again in {retry_after} seconds."
        )));
    }

    let row = db::integrations::find(&state.pool, auth.org_id(), kind.as_str())
        .await?
        .ok_or_else(not_found)?;

    let result = match factory::build_meeting_provider(
        &row,
        &state.config.encryption_key,
        &state.config.endpoints,
        &state.http,
    ) {
        Some(adapter) => adapter.verify().await,
        None => VerifyResult::failed("Integration credentials are incomplete or unreadable"),
    };

    let metadata = match &result.account {
        Some(account) => json!({ "account": account }),
        None => json!({}),
    };
    db::integrations::record_verification(&state.pool, row.id, result.success, &metadata).await?;

    audit::log_event(
        &state.pool,
        &auth,
        "integration.tested",
        "integration",
        Some(kind.as_str()),
        Some(json!({ "success": result.success })),
    )
    .await;

    Ok(Json(result))
}

pub async fn toggle(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(provider): Path<String>,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<IntegrationView>, AppError> {
    auth.require_admin()?;
    let kind = parse_provider(&provider)?;

    let row = db::integrations::set_enabled(&state.pool, auth.org_id(), kind.as_str(), req.enabled)
        .await?
        .ok_or_else(not_found)?;

    audit::log_event(
        &state.pool,
        &auth,
        if req.enabled {
            "integration.enabled"
        } else {
            "integration.disabled"
        },
        "integration",
        Some(kind.as_str()),
        None,
    )
    .await;

    Ok(Json(IntegrationView::new(row, &state.config.encryption_key)))
}

pub async fn make_default(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(provider): Path<String>,
) -> Result<Json<IntegrationView>, AppError> {
    auth.require_admin()?;
    let kind = parse_provider(&provider)?;

    let existing = db::integrations::find(&state.pool, auth.org_id(), kind.as_str())
        .await?
        .ok_or_else(not_found)?;
    if !existing.is_enabled {
        return Err(AppError::BadRequest(
            "Enable the integration before making it the default".to_string(),
        ));
    }

    let row = db::integrations::set_default(&state.pool, auth.org_id(), kind.as_str())
        .await?
        .ok_or_else(not_found)?;

    audit::log_event(
        &state.pool,
        &auth,
        "integration.default_set",
        "integration",
        Some(kind.as_str()),
        None,
    )
    .await;

    Ok(Json(IntegrationView::new(row, &state.config.encryption_key)))
}
