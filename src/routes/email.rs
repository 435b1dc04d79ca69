use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::extractor::AuthUser;
use crate::crypto;
use crate::db;
use crate::db::email_configs::UpsertEmailConfig;
use crate::email::factory::{self, EmailCredentials};
use crate::email::service::OrgMailer;
use crate::email::{EmailProviderKind, SendEmailOptions, SendEmailResult, Sender, templates};
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::{EmailLog, EmailProviderConfig};
use crate::routes::Pagination;
use crate::state::SharedState;
use crate::vendor::VerifyResult;

/// Rate-limiter key for email config tests.
const EMAIL_TEST_KEY: &str = "email";

#[derive(Serialize)]
pub struct EmailConfigView {
    #[serde(flatten)]
    pub config: EmailProviderConfig,
    pub credentials: Option<serde_json::Value>,
}

impl EmailConfigView {
    fn new(config: EmailProviderConfig, encryption_key: &str) -> Self {
        let credentials = match factory::decrypt_email_credentials(&config, encryption_key) {
            Ok(c) => Some(c.masked()),
            Err(e) => {
                tracing::warn!(organization_id = %config.organization_id, error = %e, "Stored email credentials unreadable");
                None
            }
        };
        Self {
            config,
            credentials,
        }
    }
}

#[derive(Deserialize)]
pub struct EmailConfigRequest {
    pub provider: EmailProviderKind,
    pub credentials: serde_json::Value,
    pub from_email: String,
    pub from_name: Option<String>,
    pub reply_to: Option<String>,
    #[serde(default)]
    pub track_opens: bool,
    #[serde(default)]
    pub track_clicks: bool,
}

#[derive(Deserialize)]
pub struct TestEmailRequest {
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Deserialize)]
pub struct ToggleRequest {
    pub enabled: bool,
}

#[derive(Serialize)]
pub struct TestEmailResponse {
    #[serde(flatten)]
    pub verify: VerifyResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_email: Option<SendEmailResult>,
}

fn not_configured() -> AppError {
    AppError::NotFound("Email integration not configured".to_string())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn get_config(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let config = db::email_configs::find_by_org(&state.pool, auth.org_id()).await?;

    match config {
        Some(c) => {
            let view = EmailConfigView::new(c, &state.config.encryption_key);
            let mut body = serde_json::to_value(view)
                .map_err(|e| AppError::Internal(format!("Failed to serialize config: {e}")))?;
            body["configured"] = json!(true);
            Ok(Json(body))
        }
        None => Ok(Json(json!({ "configured": false }))),
    }
}

pub async fn update_config(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<EmailConfigRequest>,
) -> Result<Json<EmailConfigView>, AppError> {
    auth.require_admin()?;

    let from_name = blank_to_none(req.from_name);
    let reply_to = blank_to_none(req.reply_to);
    let credentials = EmailCredentials::from_request(req.provider, req.credentials)?;

    // Build once so incomplete credentials are rejected before storing.
    let sender = Sender {
        email: req.from_email.trim().to_string(),
        name: from_name.clone(),
        reply_to: reply_to.clone(),
    };
    factory::provider_from_credentials(
        credentials.clone(),
        sender,
        &state.config.endpoints,
        &state.http,
    )?;

    let enc = crypto::encrypt_credentials(&credentials, &state.config.encryption_key)?;
    let row = db::email_configs::upsert(
        &state.pool,
        auth.org_id(),
        &UpsertEmailConfig {
            provider: req.provider.as_str(),
            credentials_enc: &enc,
            from_email: req.from_email.trim(),
            from_name: from_name.as_deref(),
            reply_to: reply_to.as_deref(),
            track_opens: req.track_opens,
            track_clicks: req.track_clicks,
        },
    )
    .await?;

    audit::log_event(
        &state.pool,
        &auth,
        "email_config.updated",
        "email_config",
        Some(req.provider.as_str()),
        None,
    )
    .await;

    Ok(Json(EmailConfigView::new(row, &state.config.encryption_key)))
}

pub async fn delete_config(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    if !db::email_configs::delete(&state.pool, auth.org_id()).await? {
        return Err(not_configured());
    }

    audit::log_event(
        &state.pool,
        &auth,
        "email_config.deleted",
        "email_config",
        None,
        None,
    )
    .await;

    Ok(Json(json!({ "message": "Email config removed" })))
}

/// Verify the stored credentials and optionally send a test message.
pub async fn test_config(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<TestEmailRequest>,
) -> Result<Json<TestEmailResponse>, AppError> {
    auth.require_admin()?;

    if let Err(retry_after) = state.verify_limiter.check(auth.org_id(), EMAIL_TEST_KEY) {
        return Err(AppError::RateLimited(format!(
            "Too many tests. Try again in {retry_after} seconds."
        )));
    }

    let config = db::email_configs::find_by_org(&state.pool, auth.org_id())
        .await?
        .ok_or_else(not_configured)?;

    let Some(provider) = factory::build_email_provider(
        &config,
        &state.config.encryption_key,
        &state.config.endpoints,
        &state.http,
    ) else {
        return Ok(Json(TestEmailResponse {
            verify: VerifyResult::failed("Email credentials are incomplete or unreadable"),
            test_email: None,
        }));
    };

    let verify = provider.verify().await;

    let test_email = match blank_to_none(req.to) {
        Some(to) if verify.success => {
            let mut options = SendEmailOptions::new(
                to,
                "Email integration test",
                templates::render_test_email(provider.kind().as_str()),
            );
            options.text = Some(templates::render_test_email_text(provider.kind().as_str()));
            let mailer = OrgMailer::new(&state.pool, &state.http, &state.config);
            Some(mailer.deliver(&config, provider.as_ref(), options).await)
        }
        _ => None,
    };

    let verified = verify.success && test_email.as_ref().is_none_or(|r| r.success);
    if verified {
        db::email_configs::mark_verified(&state.pool, auth.org_id()).await?;
    }

    audit::log_event(
        &state.pool,
        &auth,
        "email_config.tested",
        "email_config",
        Some(provider.kind().as_str()),
        Some(json!({ "success": verified })),
    )
    .await;

    Ok(Json(TestEmailResponse { verify, test_email }))
}

pub async fn toggle_config(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<EmailConfigView>, AppError> {
    auth.require_admin()?;

    let row = db::email_configs::set_enabled(&state.pool, auth.org_id(), req.enabled)
        .await?
        .ok_or_else(not_configured)?;

    audit::log_event(
        &state.pool,
        &auth,
        if req.enabled {
            "email_config.enabled"
        } else {
            "email_config.disabled"
        },
        "email_config",
        None,
        None,
    )
    .await;

    Ok(Json(EmailConfigView::new(row, &state.config.encryption_key)))
}

pub async fn send(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(options): Json<SendEmailOptions>,
) -> Result<Json<SendEmailResult>, AppError> {
    options.validate().map_err(AppError::BadRequest)?;

    let mailer = OrgMailer::new(&state.pool, &state.http, &state.config);
    let result = mailer.send_org_email(auth.org_id(), options).await;
    Ok(Json(result))
}

pub async fn logs(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<Pagination>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (page, per_page, offset) = params.window();

    let logs: Vec<EmailLog> =
        db::email_logs::list_by_org(&state.pool, auth.org_id(), per_page, offset).await?;

    Ok(Json(json!({
        "data": logs,
        "page": page,
        "per_page": per_page,
    })))
}
