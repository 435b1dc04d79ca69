pub mod auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod email;
pub mod error;
pub mod meetings;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod vendor;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue};
use sqlx::PgPool;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::rate_limit::VerifyRateLimiter;
use crate::state::{AppState, SharedState};

const VENDOR_TIMEOUT: Duration = Duration::from_secs(30);
/// Email bodies are the largest payloads accepted.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub fn build_app(pool: PgPool, config: Config) -> Result<Router, String> {
    let http = reqwest::Client::builder()
        .timeout(VENDOR_TIMEOUT)
        .user_agent(concat!("hirebridge/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {e}"))?;

    if config.public_base_url.is_none() {
        tracing::info!("HIREBRIDGE_PUBLIC_BASE_URL not set, email open/click tracking disabled");
    }

    let state: SharedState = Arc::new(AppState {
        pool,
        config,
        http,
        verify_limiter: VerifyRateLimiter::default(),
    });

    let app = Router::new()
        .merge(routes::api_routes())
        .merge(routes::tracking_routes())
        .route("/health", axum::routing::get(health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state);

    Ok(app)
}

async fn health() -> &'static str {
    "ok"
}
