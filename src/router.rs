use axum::{Router, middleware, routing::any};
use std::sync::Arc;
use crate::cors::cors_middleware;
use crate::handlers::{health_handler, metrics_handler, proxy_handler};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", any(health_handler))
        .route("/api/health", any(health_handler))
        // local routes shadow the same paths on upstream for every method
        .route("/metrics", any(metrics_handler))
        .fallback(proxy_handler)
        .layer(middleware::from_fn(cors_middleware))
        .with_state(state)
}
