#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use supplydesk::{
    clients::InMemoryBackend, config::AppConfig, handlers, services::pricing::PricingPolicy,
    AppState,
};
use tower::ServiceExt;

/// Router over a freshly seeded in-memory backend.
pub struct TestApp {
    router: Router,
    pub backend: Arc<InMemoryBackend>,
}

impl TestApp {
    pub fn new() -> Self {
        let backend = Arc::new(InMemoryBackend::with_sample_data(PricingPolicy::default()));
        let state = AppState::new(AppConfig::default(), backend.clone());
        Self {
            router: handlers::router(state),
            backend,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}

pub fn sample_backend() -> Arc<InMemoryBackend> {
    Arc::new(InMemoryBackend::with_sample_data(PricingPolicy::default()))
}
