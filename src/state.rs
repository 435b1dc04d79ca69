use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::rate_limit::VerifyRateLimiter;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    /// Shared outbound HTTP client handed to every adapter.
    pub http: reqwest::Client,
    pub verify_limiter: VerifyRateLimiter,
}
