use axum::Json;
use axum::extract::{Query, State};

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::models::AuditEvent;
use crate::routes::Pagination;
use crate::state::SharedState;

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<Pagination>,
) -> Result<Json<Vec<AuditEvent>>, AppError> {
    auth.require_admin()?;

    let (_, per_page, offset) = params.window();

    let events = db::audit::list(&state.pool, auth.org_id(), per_page, offset).await?;
    Ok(Json(events))
}
