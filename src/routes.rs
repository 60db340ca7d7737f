use std::time::Duration;

use axum::http::Method;
use axum::{Router, middleware, routing::get};
use tower_http::cors::{Any, CorsLayer};

use crate::AppState;
use crate::access_log::access_log;
use crate::config::Config;
use crate::handlers;

/// Create the application router.
///
/// Every path is served by the same handler. CORS sits outside the access
/// log, so preflight requests are answered without being logged.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config);

    Router::new()
        .route("/", get(handlers::serve_path))
        .route("/{*path}", get(handlers::serve_path))
        .layer(middleware::from_fn(access_log))
        .layer(cors)
        .with_state(state)
}

/// Read-only CORS policy: any origin, any header, safe methods only.
fn build_cors_layer(config: &Config) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.cors.max_age_secs))
}
