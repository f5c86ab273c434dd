pub mod api;
mod middleware;

pub use api::rate_limit::ApiRateLimiter;
pub use api::{ApiState, build_api_router};
pub use middleware::{REQUEST_ID_HEADER, RequestContext};

use axum::{Router, extract::DefaultBodyLimit, middleware as axum_middleware};

/// Full application router with request tracing and the body size cap.
pub fn build_router(state: ApiState, max_request_bytes: usize) -> Router {
    build_api_router(state)
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
