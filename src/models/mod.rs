pub mod contract;
pub mod dates;
pub mod line_item;
pub mod order;
pub mod quote;

pub use contract::{Contract, ContractStatus};
pub use line_item::{LineItem, LineItemInput};
pub use order::{Order, OrderItem, OrderStatus, OrderStatusUpdate};
pub use quote::{Quote, QuoteInput, QuoteStatus};
