//! System status and health endpoints.

use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, HealthLiveResponse, SystemStatus};

/// Returns version, uptime and cache backend reachability.
///
/// `GET /api/system/status`
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<SystemStatus>>, ApiError> {
    let shared = &state.shared;

    let cache_reachable = match shared.cache.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Cache backend ping failed");
            false
        }
    };

    let status = SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: state.start_time.elapsed().as_secs(),
        cache_backend: shared.cache.backend(),
        cache_reachable,
        providers: shared
            .aggregator
            .providers()
            .iter()
            .map(|p| p.as_str().to_string())
            .collect(),
        cache_ttl_seconds: shared.config.cache.ttl_seconds,
        email_enabled: shared.config.email.enabled,
    };

    Ok(Json(ApiResponse::success(status)))
}

/// `GET /api/health/live`
pub async fn health_live() -> impl IntoResponse {
    Json(ApiResponse::success(HealthLiveResponse { status: "alive" }))
}
