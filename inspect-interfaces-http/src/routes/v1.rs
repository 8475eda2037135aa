use axum::routing::get;
use axum::Router;

use inspect_application::AppState;

use crate::handlers::{inspect_handlers, ops_handlers};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(inspect_handlers::inspect))
        .route("/inspect", get(inspect_handlers::inspect))
        .route("/float", get(inspect_handlers::inspect))
        .route("/stats", get(inspect_handlers::stats))
        .route("/health/live", get(ops_handlers::health_live))
        .route("/health/ready", get(ops_handlers::health_ready))
        .route("/metrics/prometheus", get(ops_handlers::metrics_prometheus))
        .with_state(state)
}
