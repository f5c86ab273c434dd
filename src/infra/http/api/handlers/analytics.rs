//! Aggregate handlers

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use chaptrack_api_types::ApiEnvelope;

use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

pub async fn analytics_overview(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let overview = state.analytics.overview().await?;
    Ok(Json(ApiEnvelope::ok(overview)))
}

pub async fn filter_options(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let options = state.analytics.filter_options().await?;
    Ok(Json(ApiEnvelope::ok(options)))
}
