/// Health check endpoint
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// { "status": "healthy", "version": "0.1.0", "database": "connected", "redis": "disabled" }
/// ```
///
/// Status is `degraded` when the database is unreachable or a configured
/// Redis does not answer PING. The endpoint itself always returns 200.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use eprofile_shared::db::pool::health_check as db_health_check;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,

    /// `connected`, `disconnected`, or `disabled` when not configured
    pub redis: String,
}

pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let database_ok = db_health_check(&state.db).await.is_ok();

    let redis = match &state.redis {
        None => "disabled",
        Some(client) if client.is_healthy().await => "connected",
        Some(_) => "disconnected",
    };

    let healthy = database_ok && redis != "disconnected";

    Ok(Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if database_ok { "connected" } else { "disconnected" }.to_string(),
        redis: redis.to_string(),
    }))
}
