pub mod audit;
pub mod email;
pub mod integrations;
pub mod meetings;
pub mod suppressions;
pub mod tracking;

use axum::Router;
use axum::routing::{delete, get, post, put};
use serde::Deserialize;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Meeting integrations
        .route("/api/v1/integrations", get(integrations::list))
        .route(
            "/api/v1/integrations/{provider}",
            put(integrations::save).delete(integrations::delete),
        )
        .route("/api/v1/integrations/{provider}/test", post(integrations::test))
        .route("/api/v1/integrations/{provider}/toggle", post(integrations::toggle))
        .route(
            "/api/v1/integrations/{provider}/default",
            post(integrations::make_default),
        )
        // Email config
        .route(
            "/api/v1/email/config",
            get(email::get_config)
                .put(email::update_config)
                .delete(email::delete_config),
        )
        .route("/api/v1/email/config/test", post(email::test_config))
        .route("/api/v1/email/config/toggle", post(email::toggle_config))
        .route("/api/v1/email/send", post(email::send))
        .route("/api/v1/email/logs", get(email::logs))
        // Suppression list
        .route(
            "/api/v1/email/suppressions",
            get(suppressions::list).post(suppressions::create),
        )
        .route(
            "/api/v1/email/suppressions/{email}",
            delete(suppressions::remove),
        )
        // Meetings
        .route("/api/v1/meetings", post(meetings::create))
        // Audit
        .route("/api/v1/audit", get(audit::list))
}

/// Unauthenticated endpoints hit from recipients' mail clients.
pub fn tracking_routes() -> Router<SharedState> {
    Router::new()
        .route("/t/o/{log_id}", get(tracking::open))
        .route("/t/c/{log_id}", get(tracking::click))
}

/// `?page=&per_page=` query shared by the listing endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    /// Clamped `(page, per_page, offset)`.
    pub fn window(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(50).clamp(1, 200);
        let offset = (page - 1).saturating_mul(per_page);
        (page, per_page, offset)
    }
}
