//! Banner, health and fallback handlers

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::warn;

use crate::cache::CacheHealth;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

pub const API_VERSION: &str = "1.0.0";

#[derive(Debug, Serialize)]
pub struct EndpointMap {
    pub chapters: &'static str,
    pub analytics: &'static str,
    pub filters: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ApiBanner {
    pub success: bool,
    pub message: String,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<EndpointMap>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub success: bool,
    pub status: &'static str,
    pub store: &'static str,
    pub cache: &'static str,
    pub uptime: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

pub async fn root_banner() -> impl IntoResponse {
    Json(ApiBanner {
        success: true,
        message: "Chapter Performance Dashboard API".to_string(),
        version: API_VERSION,
        documentation: Some("/api/v1"),
        health: Some("/api/v1/health"),
        endpoints: None,
        timestamp: OffsetDateTime::now_utc(),
    })
}

pub async fn api_banner() -> impl IntoResponse {
    Json(ApiBanner {
        success: true,
        message: format!("Chapter Performance API v{API_VERSION}"),
        version: API_VERSION,
        documentation: None,
        health: None,
        endpoints: Some(EndpointMap {
            chapters: "/api/v1/chapters",
            analytics: "/api/v1/chapters/analytics",
            filters: "/api/v1/chapters/filters",
        }),
        timestamp: OffsetDateTime::now_utc(),
    })
}

/// Store outages turn the health check unhealthy; a missing cache only degrades it.
pub async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let (store, cache) = tokio::join!(state.store.ping(), state.cache.health());

    let store_up = match store {
        Ok(()) => true,
        Err(err) => {
            warn!(
                target = "chaptrack::api::health",
                error = %err,
                "store health check failed"
            );
            false
        }
    };

    let (status_code, status) = match (store_up, cache) {
        (false, _) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
        (true, CacheHealth::Unavailable) => (StatusCode::OK, "degraded"),
        (true, _) => (StatusCode::OK, "healthy"),
    };

    let report = HealthReport {
        success: store_up,
        status,
        store: if store_up { "connected" } else { "unavailable" },
        cache: cache.as_str(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        timestamp: OffsetDateTime::now_utc(),
    };
    (status_code, Json(report))
}

pub async fn route_not_found() -> ApiError {
    ApiError::route_not_found()
}
