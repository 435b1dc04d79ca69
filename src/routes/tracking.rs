use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use uuid::Uuid;

use crate::crypto;
use crate::db;
use crate::email::tracking::PIXEL_GIF;
use crate::error::AppError;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct ClickParams {
    pub u: String,
    pub s: String,
}

/// Open pixel. Always answers with the GIF, even for unknown ids.
pub async fn open(State(state): State<SharedState>, Path(log_id): Path<Uuid>) -> Response {
    if let Err(e) = db::email_logs::record_open(&state.pool, log_id).await {
        tracing::warn!(%log_id, error = %e, "Failed to record open");
    }

    (
        [
            (header::CONTENT_TYPE, "image/gif"),
            (header::CACHE_CONTROL, "no-store, max-age=0"),
        ],
        PIXEL_GIF,
    )
        .into_response()
}

/// Click redirect. Only signed http(s) targets are followed.
pub async fn click(
    State(state): State<SharedState>,
    Path(log_id): Path<Uuid>,
    Query(params): Query<ClickParams>,
) -> Result<Response, AppError> {
    let id = log_id.to_string();
    if !crypto::verify_tracking_signature(&state.config.encryption_key, &id, &params.u, &params.s)
    {
        return Err(AppError::BadRequest("Invalid tracking link".to_string()));
    }
    if !(params.u.starts_with("https://") || params.u.starts_with("http://")) {
        return Err(AppError::BadRequest("Invalid tracking link".to_string()));
    }

    if let Err(e) = db::email_logs::record_click(&state.pool, log_id).await {
        tracing::warn!(%log_id, error = %e, "Failed to record click");
    }

    Ok((StatusCode::FOUND, [(header::LOCATION, params.u)]).into_response())
}
