/// Health check endpoint
///
/// Reports liveness plus the status of both dependencies. The store is
/// load-bearing, so its failure makes the whole check 503; the cache is
/// advisory and its status is informational only.
///
/// ```text
/// GET /health
///
/// {
///   "success": true,
///   "data": {
///     "status": "up",
///     "version": "0.1.0",
///     "database": "up",
///     "cache": "down",
///     "timestamp": "2026-08-07T12:00:00Z"
///   }
/// }
/// ```

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use taskforge_shared::db::pool;

use crate::{app::AppState, response::ApiResponse};

/// Health check payload
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub database: String,
    pub cache: String,
    pub timestamp: DateTime<Utc>,
}

/// Health check handler
pub async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<HealthStatus>>) {
    let database_up = pool::health_check(&state.db).await.is_ok();
    let cache_up = state.cache.ping().await;

    let status_code = if database_up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let up_down = |up: bool| if up { "up" } else { "down" }.to_string();

    let payload = HealthStatus {
        status: up_down(database_up),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: up_down(database_up),
        cache: up_down(cache_up),
        timestamp: Utc::now(),
    };

    (status_code, Json(ApiResponse::data(payload)))
}
