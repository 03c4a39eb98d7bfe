use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use dashmap::DashMap;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{ContractGateway, OrderGateway, QuoteGateway};
use crate::{
    errors::ServiceError,
    fixtures,
    models::{
        Contract, LineItem, Order, OrderStatusUpdate, Quote, QuoteInput, QuoteStatus,
    },
    services::pricing::{self, PricingPolicy},
};

/// In-process backend holding orders, quotes and contracts.
///
/// Backs the `supplydesk` server binary and the integration tests. Writes are
/// serialized per entry by `DashMap`; quote totals are recomputed on every write so
/// stored rollups always agree with the items.
pub struct InMemoryBackend {
    orders: DashMap<Uuid, Order>,
    quotes: DashMap<Uuid, Quote>,
    contracts: DashMap<Uuid, Contract>,
    policy: PricingPolicy,
    quote_seq: AtomicU64,
    failing_reads: AtomicUsize,
    failing_writes: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new(policy: PricingPolicy) -> Self {
        Self {
            orders: DashMap::new(),
            quotes: DashMap::new(),
            contracts: DashMap::new(),
            policy,
            quote_seq: AtomicU64::new(1),
            failing_reads: AtomicUsize::new(0),
            failing_writes: AtomicUsize::new(0),
        }
    }

    /// Backend preloaded with the sample quotes, orders and contracts.
    pub fn with_sample_data(policy: PricingPolicy) -> Self {
        let backend = Self::new(policy);
        for quote in fixtures::sample_quotes() {
            backend.insert_quote(quote);
        }
        for order in fixtures::sample_orders() {
            backend.insert_order(order);
        }
        for contract in fixtures::sample_contracts() {
            backend.insert_contract(contract);
        }
        info!(
            quotes = backend.quotes.len(),
            orders = backend.orders.len(),
            contracts = backend.contracts.len(),
            "Seeded in-memory backend with sample data"
        );
        backend
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    pub fn insert_order(&self, order: Order) {
        self.orders.insert(order.id, order);
    }

    /// Stores a quote after recomputing its line totals and rollup.
    pub fn insert_quote(&self, mut quote: Quote) -> Quote {
        self.apply_totals(&mut quote);
        self.quotes.insert(quote.id, quote.clone());
        quote
    }

    pub fn insert_contract(&self, contract: Contract) {
        self.contracts.insert(contract.id, contract);
    }

    pub fn order(&self, order_id: Uuid) -> Option<Order> {
        self.orders.get(&order_id).map(|entry| entry.value().clone())
    }

    pub fn quote(&self, quote_id: Uuid) -> Option<Quote> {
        self.quotes.get(&quote_id).map(|entry| entry.value().clone())
    }

    /// Makes the next `count` read calls fail with an external service error.
    pub fn fail_next_reads(&self, count: usize) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    /// Makes the next `count` write calls fail with an external service error.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    fn check_read(&self, operation: &str) -> Result<(), ServiceError> {
        if take_one(&self.failing_reads) {
            warn!(operation, "Injected backend read failure");
            return Err(ServiceError::ExternalServiceError(format!(
                "{} failed: backend unavailable",
                operation
            )));
        }
        Ok(())
    }

    fn check_write(&self, operation: &str) -> Result<(), ServiceError> {
        if take_one(&self.failing_writes) {
            warn!(operation, "Injected backend write failure");
            return Err(ServiceError::ExternalServiceError(format!(
                "{} failed: backend unavailable",
                operation
            )));
        }
        Ok(())
    }

    fn apply_totals(&self, quote: &mut Quote) {
        let totals = pricing::recalculate(&mut quote.items, quote.tax_rate, &self.policy);
        quote.subtotal = totals.subtotal;
        quote.tax_amount = totals.tax_amount;
        quote.total = totals.total;
    }

    fn check_input(&self, input: &QuoteInput) -> Result<(), ServiceError> {
        input.validate_input()?;
        pricing::check_tax_rate(input.tax_rate)?;
        for item in &input.items {
            pricing::check_amount("quantity", item.quantity, &self.policy)?;
            pricing::check_amount("unit_price", item.unit_price, &self.policy)?;
        }
        Ok(())
    }

    fn next_quote_number(&self) -> String {
        let year = Utc::now().year();
        loop {
            let seq = self.quote_seq.fetch_add(1, Ordering::SeqCst);
            let candidate = format!("Q-{}-{:03}", year, seq);
            if !self
                .quotes
                .iter()
                .any(|entry| entry.value().quote_number == candidate)
            {
                return candidate;
            }
        }
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl OrderGateway for InMemoryBackend {
    async fn get_orders(&self) -> Result<Vec<Order>, ServiceError> {
        self.check_read("get_orders")?;
        let mut orders: Vec<Order> = self.orders.iter().map(|e| e.value().clone()).collect();
        orders.sort_by(|a, b| a.order_number.cmp(&b.order_number));
        Ok(orders)
    }

    #[instrument(skip(self, update), fields(order_id = %order_id, status = %update.status))]
    async fn update_order_status(
        &self,
        order_id: Uuid,
        update: OrderStatusUpdate,
    ) -> Result<Order, ServiceError> {
        self.check_write("update_order_status")?;

        let mut entry = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        let order = entry.value_mut();

        let shipped: HashSet<Uuid> = update.shipped_item_ids.iter().copied().collect();
        if let Some(unknown) = shipped.iter().find(|id| order.item(**id).is_none()) {
            return Err(ServiceError::ValidationError(format!(
                "Item {} does not belong to order {}",
                unknown, order.order_number
            )));
        }

        let old_status = order.status;
        for item in order.items.iter_mut() {
            item.is_shipped = shipped.contains(&item.id);
        }
        order.status = update.status;

        debug!(
            order_number = %order.order_number,
            %old_status,
            new_status = %order.status,
            "Order status stored"
        );
        Ok(order.clone())
    }
}

#[async_trait]
impl QuoteGateway for InMemoryBackend {
    async fn list_quotes(&self) -> Result<Vec<Quote>, ServiceError> {
        self.check_read("list_quotes")?;
        let mut quotes: Vec<Quote> = self.quotes.iter().map(|e| e.value().clone()).collect();
        quotes.sort_by(|a, b| a.quote_number.cmp(&b.quote_number));
        Ok(quotes)
    }

    async fn get_quote(&self, quote_id: Uuid) -> Result<Quote, ServiceError> {
        self.check_read("get_quote")?;
        self.quote(quote_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Quote {} not found", quote_id)))
    }

    #[instrument(skip(self, input), fields(customer = %input.customer_name))]
    async fn create_quote(&self, input: QuoteInput) -> Result<Quote, ServiceError> {
        self.check_write("create_quote")?;
        self.check_input(&input)?;

        let quote = Quote {
            id: Uuid::new_v4(),
            quote_number: self.next_quote_number(),
            customer_name: input.customer_name,
            customer_email: input.customer_email,
            customer_company: input.customer_company,
            issue_date: Utc::now().date_naive(),
            valid_until: input.valid_until,
            status: QuoteStatus::Draft,
            items: input.items.into_iter().map(LineItem::from).collect(),
            tax_rate: input.tax_rate,
            subtotal: Default::default(),
            tax_amount: Default::default(),
            total: Default::default(),
            notes: input.notes,
        };
        let stored = self.insert_quote(quote);
        info!(quote_number = %stored.quote_number, total = %stored.total, "Quote created");
        Ok(stored)
    }

    #[instrument(skip(self, input), fields(quote_id = %quote_id))]
    async fn update_quote(&self, quote_id: Uuid, input: QuoteInput) -> Result<Quote, ServiceError> {
        self.check_write("update_quote")?;
        self.check_input(&input)?;

        let mut entry = self
            .quotes
            .get_mut(&quote_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Quote {} not found", quote_id)))?;
        let quote = entry.value_mut();

        quote.customer_name = input.customer_name;
        quote.customer_email = input.customer_email;
        quote.customer_company = input.customer_company;
        quote.valid_until = input.valid_until;
        quote.items = input.items.into_iter().map(LineItem::from).collect();
        quote.tax_rate = input.tax_rate;
        quote.notes = input.notes;
        let totals = pricing::recalculate(&mut quote.items, quote.tax_rate, &self.policy);
        quote.subtotal = totals.subtotal;
        quote.tax_amount = totals.tax_amount;
        quote.total = totals.total;

        Ok(quote.clone())
    }

    async fn update_quote_status(
        &self,
        quote_id: Uuid,
        status: QuoteStatus,
    ) -> Result<Quote, ServiceError> {
        self.check_write("update_quote_status")?;
        let mut entry = self
            .quotes
            .get_mut(&quote_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Quote {} not found", quote_id)))?;
        entry.value_mut().status = status;
        Ok(entry.value().clone())
    }
}

#[async_trait]
impl ContractGateway for InMemoryBackend {
    async fn list_contracts(&self) -> Result<Vec<Contract>, ServiceError> {
        self.check_read("list_contracts")?;
        let mut contracts: Vec<Contract> =
            self.contracts.iter().map(|e| e.value().clone()).collect();
        contracts.sort_by(|a, b| a.contract_number.cmp(&b.contract_number));
        Ok(contracts)
    }
}
