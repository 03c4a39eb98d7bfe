//! Backend collaborators.
//!
//! The editor, tracker and dashboard never talk to a store directly; they go through
//! these gateway traits so the same services run against the HTTP backend, the
//! in-memory backend, or a test double.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    models::{Contract, Order, OrderStatusUpdate, Quote, QuoteInput, QuoteStatus},
};

pub mod http;
pub mod memory;

pub use http::HttpGateway;
pub use memory::InMemoryBackend;

#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn get_orders(&self) -> Result<Vec<Order>, ServiceError>;

    async fn update_order_status(
        &self,
        order_id: Uuid,
        update: OrderStatusUpdate,
    ) -> Result<Order, ServiceError>;
}

#[async_trait]
pub trait QuoteGateway: Send + Sync {
    async fn list_quotes(&self) -> Result<Vec<Quote>, ServiceError>;

    async fn get_quote(&self, quote_id: Uuid) -> Result<Quote, ServiceError>;

    async fn create_quote(&self, input: QuoteInput) -> Result<Quote, ServiceError>;

    async fn update_quote(&self, quote_id: Uuid, input: QuoteInput) -> Result<Quote, ServiceError>;

    async fn update_quote_status(
        &self,
        quote_id: Uuid,
        status: QuoteStatus,
    ) -> Result<Quote, ServiceError>;
}

#[async_trait]
pub trait ContractGateway: Send + Sync {
    async fn list_contracts(&self) -> Result<Vec<Contract>, ServiceError>;
}
