use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dates::iso_date;

/// Enum representing the possible statuses of an order.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    #[strum(to_string = "cancelled", serialize = "canceled")]
    #[serde(alias = "canceled")]
    Cancelled,
}

/// A shippable line of an order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_name: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub quantity: u32,
    #[serde(default, alias = "isShipped")]
    pub is_shipped: bool,
}

/// A fulfillment record tracked through the order lifecycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    #[serde(with = "iso_date")]
    pub order_date: NaiveDate,
    #[serde(default)]
    pub shipping_address: Option<String>,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
}

impl Order {
    pub fn item(&self, item_id: Uuid) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn item_mut(&mut self, item_id: Uuid) -> Option<&mut OrderItem> {
        self.items.iter_mut().find(|item| item.id == item_id)
    }

    pub fn shipped_item_ids(&self) -> Vec<Uuid> {
        self.items
            .iter()
            .filter(|item| item.is_shipped)
            .map(|item| item.id)
            .collect()
    }
}

/// Persist payload for an order status change.
///
/// Carries the item ids flagged as shipped so the backend can record them with
/// the status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
    #[serde(default)]
    pub shipped_item_ids: Vec<Uuid>,
}
