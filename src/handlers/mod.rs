pub mod contracts;
pub mod health;
pub mod orders;
pub mod quotes;

use std::sync::Arc;

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{clients::InMemoryBackend, config::AppConfig, metrics};

/// Shared state for the backend server.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub backend: Arc<InMemoryBackend>,
}

impl AppState {
    pub fn new(config: AppConfig, backend: Arc<InMemoryBackend>) -> Self {
        Self { config, backend }
    }
}

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(orders::list_orders))
        .route("/orders/:id/status", put(orders::update_order_status))
        .route(
            "/quotes",
            get(quotes::list_quotes).post(quotes::create_quote),
        )
        .route(
            "/quotes/:id",
            get(quotes::get_quote).put(quotes::update_quote),
        )
        .route("/quotes/:id/status", put(quotes::update_quote_status))
        .route("/contracts", get(contracts::list_contracts))
}

/// Full backend router: health, metrics and the v1 API.
pub fn router(state: AppState) -> Router {
    let cors = if state.config.is_development() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics_handler))
        .nest("/api/v1", api_v1_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
}

/// Wraps a handler result so every request is counted by route and outcome.
pub(crate) fn track<T, E>(route: &str, result: Result<T, E>) -> Result<T, E> {
    metrics::record_request(route, result.is_ok());
    result
}
