//! Router assembly: wires every handler to its path and applies the CORS layer
//! described by `ApiConfig`.

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

use super::{handlers, ApiConfig};

pub fn build(state: Arc<AppState>, config: &ApiConfig) -> Router {
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any)
    };

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/proxies/scrape", post(handlers::scrape_proxies))
        .route("/proxies/validate", post(handlers::validate_proxies))
        .route("/proxies/import", post(handlers::import_proxies))
        .route("/proxies/random", get(handlers::random_proxy))
        .route("/proxies/stats", get(handlers::proxy_stats))
        .route("/proxies/export", get(handlers::export_proxies))
        .route("/proxies/schedule", post(handlers::schedule_job))
        .route("/proxies/scheduler/status", get(handlers::scheduler_status))
        .route("/proxies/scheduler/update", post(handlers::update_scheduler))
        .route(
            "/proxies",
            get(handlers::list_proxies).delete(handlers::delete_proxies),
        )
        .route("/proxies/:id", get(handlers::get_proxy).patch(handlers::patch_proxy))
        .route("/jobs/:id", get(handlers::get_job))
        .route("/webhooks/register", post(handlers::register_webhook))
        .route("/webhooks", get(handlers::list_webhooks))
        .route("/webhooks/:id", delete(handlers::delete_webhook))
        .fallback(handlers::not_found)
        .layer(cors)
        .with_state(state)
}
