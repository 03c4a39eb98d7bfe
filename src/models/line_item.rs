use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// One priced row within a quote.
///
/// `total` is derived from `quantity * unit_price` and is only written by the
/// pricing engine; callers read it through [`LineItem::total`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[serde(default)]
    total: Decimal,
}

impl LineItem {
    /// Creates an item with a fresh id. The stored total is left at zero until the
    /// owning quote runs a recalculation.
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            quantity,
            unit_price,
            total: Decimal::ZERO,
        }
    }

    /// An empty row as added by the "add item" action of the editor.
    pub fn blank() -> Self {
        Self::new(String::new(), Decimal::ONE, Decimal::ZERO)
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub(crate) fn set_total(&mut self, total: Decimal) {
        self.total = total;
    }

    pub fn to_input(&self) -> LineItemInput {
        LineItemInput {
            id: Some(self.id),
            description: self.description.clone(),
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }
}

/// Create/update payload for a line item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct LineItemInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[validate(length(min = 1, message = "Line item description is required"))]
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl From<LineItemInput> for LineItem {
    fn from(input: LineItemInput) -> Self {
        let mut item = LineItem::new(input.description, input.quantity, input.unit_price);
        if let Some(id) = input.id {
            item.id = id;
        }
        item
    }
}
