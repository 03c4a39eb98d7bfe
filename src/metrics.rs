//! Prometheus counters for quote and fulfillment activity, rendered at `/metrics`.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::error;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref ORDER_COMMITS: IntCounter = register_counter(
        "supplydesk_order_commits_total",
        "Total number of order status commits attempted"
    );
    pub static ref ORDER_COMMIT_FAILURES: IntCounter = register_counter(
        "supplydesk_order_commit_failures_total",
        "Total number of order status commits that failed to persist"
    );
    pub static ref ORDERS_SHIPPED: IntCounter = register_counter(
        "supplydesk_orders_shipped_total",
        "Total number of orders committed as shipped"
    );
    pub static ref QUOTES_SAVED: IntCounter = register_counter(
        "supplydesk_quotes_saved_total",
        "Total number of quotes created or updated"
    );
    pub static ref BACKEND_REQUESTS: IntCounterVec = {
        let counter = IntCounterVec::new(
            Opts::new(
                "supplydesk_backend_requests_total",
                "Backend HTTP requests by route and outcome"
            ),
            &["route", "outcome"],
        )
        .expect("metric can be created");
        if let Err(e) = REGISTRY.register(Box::new(counter.clone())) {
            error!("Failed to register backend request counter: {}", e);
        }
        counter
    };
}

fn register_counter(name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::new(name, help).expect("metric can be created");
    if let Err(e) = REGISTRY.register(Box::new(counter.clone())) {
        error!("Failed to register counter {}: {}", name, e);
    }
    counter
}

/// Records one handled backend request.
pub fn record_request(route: &str, ok: bool) {
    BACKEND_REQUESTS
        .with_label_values(&[route, if ok { "ok" } else { "error" }])
        .inc();
}

/// Renders every registered metric in the Prometheus text format.
pub fn render() -> String {
    // Touch the lazies so a fresh process still lists every counter.
    let _ = (
        ORDER_COMMITS.get(),
        ORDER_COMMIT_FAILURES.get(),
        ORDERS_SHIPPED.get(),
        QUOTES_SAVED.get(),
    );
    lazy_static::initialize(&BACKEND_REQUESTS);

    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer) {
        error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}
