//! Warehouse fulfillment dashboard.
//!
//! Operators tick items as shipped, then save. Saving is split in two phases:
//!
//! 1. [`FulfillmentDashboard::apply`] computes the target status from the item flags
//!    and claims the order's in-flight slot. The local status is left untouched.
//! 2. [`FulfillmentDashboard::reconcile`] persists the transition and re-fetches the
//!    order list. If the persist fails the re-fetch still runs, so local toggles that
//!    never reached the backend are discarded in favour of the stored state.
//!
//! Only `processing -> shipped` (and back) is decided here; every other lifecycle
//! step belongs to the backend.

use std::sync::Arc;

use dashmap::DashSet;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    clients::OrderGateway,
    config::FulfillmentConfig,
    errors::ServiceError,
    metrics::{ORDERS_SHIPPED, ORDER_COMMITS, ORDER_COMMIT_FAILURES},
    models::{Order, OrderStatus, OrderStatusUpdate},
    notifications::{Notice, Notifier},
};

/// Which dashboard list an order belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "view", content = "status", rename_all = "snake_case")]
pub enum OrderView {
    NewOrders,
    Delivered,
    /// Pending, shipped and cancelled orders are not shown on either list.
    Untracked(OrderStatus),
}

pub fn classify(order: &Order) -> OrderView {
    match order.status {
        OrderStatus::Processing => OrderView::NewOrders,
        OrderStatus::Delivered => OrderView::Delivered,
        other => OrderView::Untracked(other),
    }
}

/// Status an order should be saved with given its current item flags.
pub fn target_status(order: &Order) -> OrderStatus {
    if order.items.iter().all(|item| item.is_shipped) {
        OrderStatus::Shipped
    } else {
        OrderStatus::Processing
    }
}

/// Only `processing` orders can be toggled or saved from the dashboard.
pub fn is_locked(order: &Order) -> bool {
    order.status != OrderStatus::Processing
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct DashboardPartition {
    pub new_orders: Vec<Order>,
    pub delivered: Vec<Order>,
    pub untracked: Vec<Order>,
}

impl DashboardPartition {
    pub fn from_orders(orders: &[Order]) -> Self {
        let mut partition = Self::default();
        for order in orders {
            match classify(order) {
                OrderView::NewOrders => partition.new_orders.push(order.clone()),
                OrderView::Delivered => partition.delivered.push(order.clone()),
                OrderView::Untracked(_) => partition.untracked.push(order.clone()),
            }
        }
        partition
    }
}

/// Releases the in-flight claim for an order when dropped.
#[derive(Debug)]
struct InFlightSlot {
    order_id: Uuid,
    in_flight: Arc<DashSet<Uuid>>,
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.in_flight.remove(&self.order_id);
    }
}

/// A computed status transition waiting to be persisted.
#[derive(Debug)]
#[must_use = "a transition does nothing until passed to `reconcile`"]
pub struct PendingTransition {
    pub order_id: Uuid,
    pub order_number: String,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub shipped_item_ids: Vec<Uuid>,
    _slot: Option<InFlightSlot>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommitOutcome {
    pub order_id: Uuid,
    pub order_number: String,
    pub previous: OrderStatus,
    pub status: OrderStatus,
}

#[derive(Debug, Default)]
struct DashboardState {
    orders: Vec<Order>,
    error_banner: Option<String>,
}

pub struct FulfillmentDashboard {
    gateway: Arc<dyn OrderGateway>,
    notifier: Arc<dyn Notifier>,
    dedupe_in_flight: bool,
    in_flight: Arc<DashSet<Uuid>>,
    state: RwLock<DashboardState>,
}

impl FulfillmentDashboard {
    pub fn new(gateway: Arc<dyn OrderGateway>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_config(gateway, notifier, &FulfillmentConfig::default())
    }

    pub fn with_config(
        gateway: Arc<dyn OrderGateway>,
        notifier: Arc<dyn Notifier>,
        config: &FulfillmentConfig,
    ) -> Self {
        Self {
            gateway,
            notifier,
            dedupe_in_flight: config.dedupe_in_flight_commits,
            in_flight: Arc::new(DashSet::new()),
            state: RwLock::new(DashboardState::default()),
        }
    }

    /// Fetches every order from the backend and replaces the local copy.
    ///
    /// On failure the previous orders stay loaded (possibly stale or empty) and an
    /// error banner is set until the next successful refresh.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), ServiceError> {
        match self.gateway.get_orders().await {
            Ok(orders) => {
                let partition = DashboardPartition::from_orders(&orders);
                info!(
                    total = orders.len(),
                    new_orders = partition.new_orders.len(),
                    delivered = partition.delivered.len(),
                    "Orders loaded"
                );
                let mut state = self.state.write().await;
                state.orders = orders;
                state.error_banner = None;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to load orders");
                self.state.write().await.error_banner =
                    Some(format!("Could not load orders: {}", e));
                self.notifier
                    .notify(Notice::error(format!("Failed to load orders: {}", e)));
                Err(e)
            }
        }
    }

    pub async fn partition(&self) -> DashboardPartition {
        DashboardPartition::from_orders(&self.state.read().await.orders)
    }

    pub async fn new_orders(&self) -> Vec<Order> {
        self.partition().await.new_orders
    }

    pub async fn delivered(&self) -> Vec<Order> {
        self.partition().await.delivered
    }

    pub async fn order(&self, order_id: Uuid) -> Option<Order> {
        self.state
            .read()
            .await
            .orders
            .iter()
            .find(|order| order.id == order_id)
            .cloned()
    }

    /// Finds an order by its number, e.g. `ORD-1001`.
    pub async fn find_by_number(&self, order_number: &str) -> Option<Order> {
        self.state
            .read()
            .await
            .orders
            .iter()
            .find(|order| order.order_number.eq_ignore_ascii_case(order_number))
            .cloned()
    }

    pub async fn error_banner(&self) -> Option<String> {
        self.state.read().await.error_banner.clone()
    }

    /// Flips an item's shipped flag locally and returns the new value.
    pub async fn toggle_item(&self, order_id: Uuid, item_id: Uuid) -> Result<bool, ServiceError> {
        self.update_item(order_id, item_id, |shipped| !shipped).await
    }

    pub async fn set_item_shipped(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        shipped: bool,
    ) -> Result<bool, ServiceError> {
        self.update_item(order_id, item_id, |_| shipped).await
    }

    /// Flags every item of the order as shipped.
    pub async fn mark_all_shipped(&self, order_id: Uuid) -> Result<(), ServiceError> {
        let mut state = self.state.write().await;
        let order = editable_order(&mut state.orders, order_id)?;
        for item in order.items.iter_mut() {
            item.is_shipped = true;
        }
        Ok(())
    }

    async fn update_item(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        next: impl FnOnce(bool) -> bool,
    ) -> Result<bool, ServiceError> {
        let mut state = self.state.write().await;
        let order = editable_order(&mut state.orders, order_id)?;
        let order_number = order.order_number.clone();
        let item = order.item_mut(item_id).ok_or_else(|| {
            ServiceError::NotFound(format!("Item {} not found on order {}", item_id, order_number))
        })?;
        item.is_shipped = next(item.is_shipped);
        Ok(item.is_shipped)
    }

    /// Phase one: compute the target status and claim the order's in-flight slot.
    ///
    /// The local copy is not modified; dropping the transition without calling
    /// [`reconcile`](Self::reconcile) leaves the dashboard as it was. Fails with
    /// `Conflict` when a save for the same order is already in flight and
    /// de-duplication is on.
    pub async fn apply(&self, order_id: Uuid) -> Result<PendingTransition, ServiceError> {
        let mut state = self.state.write().await;

        let slot = if self.dedupe_in_flight {
            if !self.in_flight.insert(order_id) {
                warn!(order_id = %order_id, "Save already in flight for order");
                let label = state
                    .orders
                    .iter()
                    .find(|order| order.id == order_id)
                    .map(|order| order.order_number.clone())
                    .unwrap_or_else(|| order_id.to_string());
                return Err(ServiceError::Conflict(format!(
                    "Order {} is already being saved",
                    label
                )));
            }
            Some(InFlightSlot {
                order_id,
                in_flight: self.in_flight.clone(),
            })
        } else {
            None
        };

        let order = editable_order(&mut state.orders, order_id)?;
        let from = order.status;
        let to = target_status(order);

        Ok(PendingTransition {
            order_id,
            order_number: order.order_number.clone(),
            from,
            to,
            shipped_item_ids: order.shipped_item_ids(),
            _slot: slot,
        })
    }

    /// Phase two: persist the transition, then re-read the authoritative order list.
    ///
    /// The re-read happens whether or not the persist succeeded. A failed persist is
    /// reported to the notifier and returned; the in-flight claim is released when
    /// `pending` is dropped at the end of this call.
    #[instrument(skip(self, pending), fields(order_id = %pending.order_id, from = %pending.from, to = %pending.to))]
    pub async fn reconcile(
        &self,
        pending: PendingTransition,
    ) -> Result<CommitOutcome, ServiceError> {
        ORDER_COMMITS.inc();
        let update = OrderStatusUpdate {
            status: pending.to,
            shipped_item_ids: pending.shipped_item_ids.clone(),
        };

        match self.gateway.update_order_status(pending.order_id, update).await {
            Ok(stored) => {
                if stored.status == OrderStatus::Shipped {
                    ORDERS_SHIPPED.inc();
                }
                info!(
                    order_number = %pending.order_number,
                    status = %stored.status,
                    "Order status saved"
                );
                self.notifier.notify(Notice::success(format!(
                    "Order {} saved as {}",
                    pending.order_number, stored.status
                )));
                if let Err(e) = self.refresh().await {
                    warn!(error = %e, "Order saved but the follow-up reload failed");
                }
                Ok(CommitOutcome {
                    order_id: pending.order_id,
                    order_number: pending.order_number.clone(),
                    previous: pending.from,
                    status: stored.status,
                })
            }
            Err(e) => {
                ORDER_COMMIT_FAILURES.inc();
                error!(
                    order_number = %pending.order_number,
                    error = %e,
                    "Failed to save order status; reloading from backend"
                );
                self.notifier.notify(Notice::error(format!(
                    "Failed to save order {}: {}",
                    pending.order_number, e
                )));
                if let Err(reload) = self.refresh().await {
                    error!(error = %reload, "Reload after failed save also failed");
                }
                Err(e)
            }
        }
    }

    /// Computes, persists and reconciles the status of one order.
    pub async fn commit(&self, order_id: Uuid) -> Result<CommitOutcome, ServiceError> {
        let pending = self.apply(order_id).await?;
        self.reconcile(pending).await
    }
}

fn editable_order(orders: &mut [Order], order_id: Uuid) -> Result<&mut Order, ServiceError> {
    let order = orders
        .iter_mut()
        .find(|order| order.id == order_id)
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
    if is_locked(order) {
        return Err(ServiceError::InvalidOperation(format!(
            "Order {} is {} and cannot be changed from the dashboard",
            order.order_number, order.status
        )));
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clients::InMemoryBackend,
        fixtures::{
            self, ORDER_CANCELLED, ORDER_DELIVERED, ORDER_PARTIAL, ORDER_PENDING, ORDER_SHIPPED,
            ORDER_SINGLE,
        },
        notifications::MemoryNotifier,
        services::pricing::PricingPolicy,
    };
    use assert_matches::assert_matches;

    async fn dashboard() -> (Arc<InMemoryBackend>, Arc<MemoryNotifier>, FulfillmentDashboard) {
        let backend = Arc::new(InMemoryBackend::with_sample_data(PricingPolicy::default()));
        let notifier = Arc::new(MemoryNotifier::new());
        let dashboard = FulfillmentDashboard::new(backend.clone(), notifier.clone());
        dashboard.refresh().await.unwrap();
        (backend, notifier, dashboard)
    }

    #[test]
    fn classification_is_one_bucket_per_order() {
        let partition = DashboardPartition::from_orders(&fixtures::sample_orders());
        assert_eq!(partition.new_orders.len(), 2);
        assert_eq!(partition.delivered.len(), 2);
        assert_eq!(partition.untracked.len(), 3);
        assert!(partition
            .untracked
            .iter()
            .all(|o| matches!(classify(o), OrderView::Untracked(_))));
    }

    #[test]
    fn target_requires_every_item() {
        let mut order = fixtures::sample_orders().remove(0);
        assert_eq!(target_status(&order), OrderStatus::Processing);

        order.items[0].is_shipped = true;
        assert_eq!(target_status(&order), OrderStatus::Processing);

        order.items[1].is_shipped = true;
        assert_eq!(target_status(&order), OrderStatus::Shipped);

        order.items[0].is_shipped = false;
        assert_eq!(target_status(&order), OrderStatus::Processing);
    }

    #[tokio::test]
    async fn toggle_is_local_only() {
        let (backend, _, dashboard) = dashboard().await;
        let item = backend.order(ORDER_PARTIAL).unwrap().items[0].id;

        assert!(dashboard.toggle_item(ORDER_PARTIAL, item).await.unwrap());
        let local = dashboard.order(ORDER_PARTIAL).await.unwrap();
        assert!(local.item(item).unwrap().is_shipped);
        assert_eq!(local.status, OrderStatus::Processing);
        assert!(!backend.order(ORDER_PARTIAL).unwrap().item(item).unwrap().is_shipped);

        assert!(!dashboard.toggle_item(ORDER_PARTIAL, item).await.unwrap());
    }

    #[tokio::test]
    async fn partial_save_stays_processing() {
        let (backend, _, dashboard) = dashboard().await;
        let item = backend.order(ORDER_PARTIAL).unwrap().items[0].id;
        dashboard.set_item_shipped(ORDER_PARTIAL, item, true).await.unwrap();

        let outcome = dashboard.commit(ORDER_PARTIAL).await.unwrap();
        assert_eq!(outcome.status, OrderStatus::Processing);
        let stored = backend.order(ORDER_PARTIAL).unwrap();
        assert_eq!(stored.status, OrderStatus::Processing);
        assert!(stored.item(item).unwrap().is_shipped);
    }

    #[tokio::test]
    async fn full_save_ships_and_leaves_new_orders() {
        let (backend, notifier, dashboard) = dashboard().await;
        dashboard.mark_all_shipped(ORDER_PARTIAL).await.unwrap();

        let outcome = dashboard.commit(ORDER_PARTIAL).await.unwrap();
        assert_eq!(outcome.previous, OrderStatus::Processing);
        assert_eq!(outcome.status, OrderStatus::Shipped);
        assert_eq!(backend.order(ORDER_PARTIAL).unwrap().status, OrderStatus::Shipped);

        let new_orders = dashboard.new_orders().await;
        assert!(new_orders.iter().all(|o| o.id != ORDER_PARTIAL));
        assert_eq!(
            notifier.last().unwrap().level,
            crate::notifications::NoticeLevel::Success
        );
    }

    #[tokio::test]
    async fn locked_orders_reject_toggle_and_save() {
        let (backend, _, dashboard) = dashboard().await;
        for order_id in [ORDER_SHIPPED, ORDER_DELIVERED, ORDER_CANCELLED, ORDER_PENDING] {
            let item = backend.order(order_id).unwrap().items[0].id;
            assert_matches!(
                dashboard.toggle_item(order_id, item).await,
                Err(ServiceError::InvalidOperation(_))
            );
            assert_matches!(
                dashboard.commit(order_id).await,
                Err(ServiceError::InvalidOperation(_))
            );
        }
    }

    #[tokio::test]
    async fn cancelled_and_pending_orders_are_never_saved() {
        let (backend, _, dashboard) = dashboard().await;
        for (order_id, status) in [
            (ORDER_CANCELLED, OrderStatus::Cancelled),
            (ORDER_PENDING, OrderStatus::Pending),
        ] {
            assert_matches!(
                dashboard.mark_all_shipped(order_id).await,
                Err(ServiceError::InvalidOperation(_))
            );
            assert_matches!(
                dashboard.commit(order_id).await,
                Err(ServiceError::InvalidOperation(_))
            );
            assert_eq!(backend.order(order_id).unwrap().status, status);
        }
    }

    #[tokio::test]
    async fn dropped_transition_leaves_order_editable() {
        let (backend, _, dashboard) = dashboard().await;
        dashboard.mark_all_shipped(ORDER_SINGLE).await.unwrap();

        let pending = dashboard.apply(ORDER_SINGLE).await.unwrap();
        assert_eq!(pending.to, OrderStatus::Shipped);
        drop(pending);

        let local = dashboard.order(ORDER_SINGLE).await.unwrap();
        assert_eq!(local.status, OrderStatus::Processing);
        assert_eq!(backend.order(ORDER_SINGLE).unwrap().status, OrderStatus::Processing);

        let outcome = dashboard.commit(ORDER_SINGLE).await.unwrap();
        assert_eq!(outcome.status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn failed_save_discards_local_toggles() {
        let (backend, notifier, dashboard) = dashboard().await;
        dashboard.mark_all_shipped(ORDER_SINGLE).await.unwrap();

        backend.fail_next_writes(1);
        assert!(dashboard.commit(ORDER_SINGLE).await.is_err());

        let local = dashboard.order(ORDER_SINGLE).await.unwrap();
        assert_eq!(local.status, OrderStatus::Processing);
        assert!(local.items.iter().all(|item| !item.is_shipped));
        assert!(notifier
            .notices()
            .iter()
            .any(|n| n.message.contains("Failed to save order ORD-1002")));
    }

    #[tokio::test]
    async fn apply_claims_and_drop_releases_slot() {
        let (_, _, dashboard) = dashboard().await;
        let pending = dashboard.apply(ORDER_SINGLE).await.unwrap();
        assert_matches!(
            dashboard.apply(ORDER_SINGLE).await,
            Err(ServiceError::Conflict(_))
        );
        drop(pending);
        assert!(dashboard.apply(ORDER_SINGLE).await.is_ok());
    }

    #[tokio::test]
    async fn dedupe_can_be_disabled() {
        let backend = Arc::new(InMemoryBackend::with_sample_data(PricingPolicy::default()));
        let dashboard = FulfillmentDashboard::with_config(
            backend,
            Arc::new(MemoryNotifier::new()),
            &FulfillmentConfig {
                dedupe_in_flight_commits: false,
            },
        );
        dashboard.refresh().await.unwrap();
        let _first = dashboard.apply(ORDER_SINGLE).await.unwrap();
        assert!(dashboard.apply(ORDER_SINGLE).await.is_ok());
    }

    #[tokio::test]
    async fn failed_load_sets_banner_and_keeps_orders() {
        let (backend, _, dashboard) = dashboard().await;
        backend.fail_next_reads(1);
        assert!(dashboard.refresh().await.is_err());
        assert!(dashboard.error_banner().await.is_some());
        assert_eq!(dashboard.new_orders().await.len(), 2);
    }

    #[tokio::test]
    async fn unknown_order_or_item_is_not_found() {
        let (_, _, dashboard) = dashboard().await;
        assert_matches!(
            dashboard.toggle_item(Uuid::new_v4(), Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        );
        assert_matches!(
            dashboard.toggle_item(ORDER_PARTIAL, Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        );
    }
}
