use axum::Json;
use axum::extract::State;
use serde::Deserialize;

use crate::auth::extractor::AuthUser;
use crate::error::AppError;
use crate::meetings::service::OrgMeetings;
use crate::meetings::{CreateMeetingOptions, MeetingProviderKind, MeetingResult};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateMeetingRequest {
    /// Falls back to the organization's default integration.
    #[serde(default)]
    pub provider: Option<MeetingProviderKind>,
    #[serde(flatten)]
    pub options: CreateMeetingOptions,
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateMeetingRequest>,
) -> Result<Json<MeetingResult>, AppError> {
    req.options.validate().map_err(AppError::BadRequest)?;

    let meetings = OrgMeetings::new(&state.pool, &state.http, &state.config);
    let result = meetings
        .create_org_meeting(auth.org_id(), req.provider, &req.options)
        .await;
    Ok(Json(result))
}
