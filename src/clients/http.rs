use std::time::Duration;

use async_trait::async_trait;
use ::http::StatusCode;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{ContractGateway, OrderGateway, QuoteGateway};
use crate::{
    errors::{ErrorResponse, ServiceError},
    models::{Contract, Order, OrderStatusUpdate, Quote, QuoteInput, QuoteStatus},
    ApiResponse,
};

/// Talks to a `supplydesk` backend over its `/api/v1` JSON routes.
#[derive(Clone, Debug)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct QuoteStatusBody {
    status: QuoteStatus,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ServiceError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_body(status, &body));
        }

        let envelope: ApiResponse<T> = response.json().await?;
        match envelope.data {
            Some(data) if envelope.success => Ok(data),
            _ => Err(ServiceError::ExternalServiceError(
                envelope
                    .message
                    .unwrap_or_else(|| "backend returned an empty response".to_string()),
            )),
        }
    }
}

/// Display prefixes the backend puts in front of `ErrorResponse.message`.
const ERROR_PREFIXES: [&str; 8] = [
    "Not found: ",
    "Validation error: ",
    "Invalid operation: ",
    "Invalid status: ",
    "Conflict: ",
    "External service error: ",
    "Serialization error: ",
    "Internal error: ",
];

fn strip_error_prefix(message: &str) -> &str {
    ERROR_PREFIXES
        .iter()
        .find_map(|prefix| message.strip_prefix(prefix))
        .unwrap_or(message)
}

fn error_from_body(status: StatusCode, body: &str) -> ServiceError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|err| strip_error_prefix(&err.message).to_string())
        .unwrap_or_else(|_| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body.to_string()
            }
        });
    warn!(%status, %message, "Backend request failed");
    ServiceError::from_status(status, message)
}

#[async_trait]
impl OrderGateway for HttpGateway {
    async fn get_orders(&self) -> Result<Vec<Order>, ServiceError> {
        debug!("GET /orders");
        self.send(self.client.get(self.url("/orders"))).await
    }

    #[instrument(skip(self, update), fields(order_id = %order_id, status = %update.status))]
    async fn update_order_status(
        &self,
        order_id: Uuid,
        update: OrderStatusUpdate,
    ) -> Result<Order, ServiceError> {
        let url = self.url(&format!("/orders/{}/status", order_id));
        self.send(self.client.put(url).json(&update)).await
    }
}

#[async_trait]
impl QuoteGateway for HttpGateway {
    async fn list_quotes(&self) -> Result<Vec<Quote>, ServiceError> {
        self.send(self.client.get(self.url("/quotes"))).await
    }

    async fn get_quote(&self, quote_id: Uuid) -> Result<Quote, ServiceError> {
        let url = self.url(&format!("/quotes/{}", quote_id));
        self.send(self.client.get(url)).await
    }

    #[instrument(skip(self, input), fields(customer = %input.customer_name))]
    async fn create_quote(&self, input: QuoteInput) -> Result<Quote, ServiceError> {
        self.send(self.client.post(self.url("/quotes")).json(&input))
            .await
    }

    #[instrument(skip(self, input), fields(quote_id = %quote_id))]
    async fn update_quote(&self, quote_id: Uuid, input: QuoteInput) -> Result<Quote, ServiceError> {
        let url = self.url(&format!("/quotes/{}", quote_id));
        self.send(self.client.put(url).json(&input)).await
    }

    async fn update_quote_status(
        &self,
        quote_id: Uuid,
        status: QuoteStatus,
    ) -> Result<Quote, ServiceError> {
        let url = self.url(&format!("/quotes/{}/status", quote_id));
        self.send(self.client.put(url).json(&QuoteStatusBody { status }))
            .await
    }
}

#[async_trait]
impl ContractGateway for HttpGateway {
    async fn list_contracts(&self) -> Result<Vec<Contract>, ServiceError> {
        self.send(self.client.get(self.url("/contracts"))).await
    }
}
