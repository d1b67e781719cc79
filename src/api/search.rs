use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, SearchParams, SearchRequest, validation};
use crate::domain::AggregateResult;

/// `POST /api/search` with body `{"query": "..."}`.
pub async fn search(
    State(state): State<Arc<AppState>>,
    request: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AggregateResult>>, ApiError> {
    let Json(request) = request.map_err(|e| {
        tracing::debug!(error = %e, "Rejected search body");
        ApiError::validation("Invalid search query")
    })?;

    let query = validation::validate_search_query(validation::json_str(request.query.as_ref()))?;
    let results = state.shared.aggregator.search(query).await?;
    Ok(Json(ApiResponse::success(results)))
}

/// `GET /api/search?q=...`
pub async fn search_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ApiResponse<AggregateResult>>, ApiError> {
    let query = validation::validate_search_query(params.q.as_deref())?;
    let results = state.shared.aggregator.search(query).await?;
    Ok(Json(ApiResponse::success(results)))
}
