pub mod error;
pub mod handlers;
pub mod middleware;
pub mod rate_limit;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};

/// Public reads plus the bearer-protected admin writes, rate limited per client.
///
/// Static segments such as `/chapters/analytics` win over the `{id}` capture.
pub fn build_api_router(state: ApiState) -> Router {
    let admin = Router::new()
        .route("/api/v1/chapters", post(handlers::upload_chapters))
        .route("/api/v1/chapters/single", post(handlers::create_chapter))
        .route(
            "/api/v1/chapters/{id}",
            put(handlers::update_chapter).delete(handlers::delete_chapter),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::admin_auth,
        ));

    Router::new()
        .route("/", get(handlers::root_banner))
        .route("/api/v1", get(handlers::api_banner))
        .route("/api/v1/", get(handlers::api_banner))
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/chapters", get(handlers::list_chapters))
        .route("/api/v1/chapters/analytics", get(handlers::analytics_overview))
        .route("/api/v1/chapters/filters", get(handlers::filter_options))
        .route("/api/v1/chapters/{id}", get(handlers::get_chapter))
        .merge(admin)
        .fallback(handlers::route_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::api_rate_limit,
        ))
        .with_state(state)
}
