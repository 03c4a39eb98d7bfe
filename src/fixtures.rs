//! Sample quotes, orders and service contracts.
//!
//! Used to seed the in-memory backend for demos and tests. Identifiers are fixed so
//! contracts can point at their quotes and tests can address records directly.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::models::{
    Contract, ContractStatus, LineItem, Order, OrderItem, OrderStatus, Quote, QuoteStatus,
};

pub const QUOTE_ACME: Uuid = Uuid::from_u128(0x5d0e_0000_0000_4000_8000_0000_0000_0001);
pub const QUOTE_LAKESIDE: Uuid = Uuid::from_u128(0x5d0e_0000_0000_4000_8000_0000_0000_0002);
pub const QUOTE_PINECREST: Uuid = Uuid::from_u128(0x5d0e_0000_0000_4000_8000_0000_0000_0003);
pub const QUOTE_NORTHWIND: Uuid = Uuid::from_u128(0x5d0e_0000_0000_4000_8000_0000_0000_0004);
pub const QUOTE_SUMMIT: Uuid = Uuid::from_u128(0x5d0e_0000_0000_4000_8000_0000_0000_0005);
pub const QUOTE_RIVERBEND: Uuid = Uuid::from_u128(0x5d0e_0000_0000_4000_8000_0000_0000_0006);

pub const ORDER_PARTIAL: Uuid = Uuid::from_u128(0x0bd3_0000_0000_4000_8000_0000_0000_0001);
pub const ORDER_SINGLE: Uuid = Uuid::from_u128(0x0bd3_0000_0000_4000_8000_0000_0000_0002);
pub const ORDER_PENDING: Uuid = Uuid::from_u128(0x0bd3_0000_0000_4000_8000_0000_0000_0003);
pub const ORDER_SHIPPED: Uuid = Uuid::from_u128(0x0bd3_0000_0000_4000_8000_0000_0000_0004);
pub const ORDER_DELIVERED: Uuid = Uuid::from_u128(0x0bd3_0000_0000_4000_8000_0000_0000_0005);
pub const ORDER_DELIVERED_EARLIER: Uuid = Uuid::from_u128(0x0bd3_0000_0000_4000_8000_0000_0000_0006);
pub const ORDER_CANCELLED: Uuid = Uuid::from_u128(0x0bd3_0000_0000_4000_8000_0000_0000_0007);

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

fn item(seed: u128, description: &str, quantity: Decimal, unit_price: Decimal) -> LineItem {
    let mut item = LineItem::new(description, quantity, unit_price);
    item.id = Uuid::from_u128(0x11e0_0000_0000_4000_8000_0000_0000_0000 | seed);
    item
}

#[allow(clippy::too_many_arguments)]
fn quote(
    id: Uuid,
    number: &str,
    customer: &str,
    company: Option<&str>,
    issued: NaiveDate,
    status: QuoteStatus,
    tax_rate: Decimal,
    items: Vec<LineItem>,
) -> Quote {
    Quote {
        id,
        quote_number: number.to_string(),
        customer_name: customer.to_string(),
        customer_email: None,
        customer_company: company.map(str::to_string),
        issue_date: issued,
        valid_until: issued.checked_add_days(chrono::Days::new(30)),
        status,
        items,
        tax_rate,
        subtotal: Decimal::ZERO,
        tax_amount: Decimal::ZERO,
        total: Decimal::ZERO,
        notes: None,
    }
}

/// Quotes in every status. Totals are zero here and filled in by the backend.
pub fn sample_quotes() -> Vec<Quote> {
    vec![
        quote(
            QUOTE_ACME,
            "Q-2024-001",
            "Acme Corporation",
            Some("Acme Corporation"),
            date(2024, 1, 15),
            QuoteStatus::Accepted,
            dec!(8.5),
            vec![item(1, "Multifunction laser printer, A3 colour", dec!(10), dec!(150))],
        ),
        quote(
            QUOTE_LAKESIDE,
            "Q-2024-002",
            "Lakeside Medical Group",
            Some("Lakeside Medical"),
            date(2024, 1, 22),
            QuoteStatus::Sent,
            dec!(8.5),
            vec![
                item(2, "Toner cartridge, black, high yield", dec!(24), dec!(89.99)),
                item(3, "Copy paper, letter, 10-ream case", dec!(40), dec!(42.50)),
            ],
        ),
        quote(
            QUOTE_PINECREST,
            "Q-2024-003",
            "Pinecrest School District",
            None,
            date(2024, 2, 3),
            QuoteStatus::Draft,
            dec!(0),
            vec![item(4, "Managed print service, per device/month", dec!(35), dec!(28))],
        ),
        quote(
            QUOTE_NORTHWIND,
            "Q-2024-004",
            "Northwind Logistics",
            Some("Northwind"),
            date(2024, 2, 11),
            QuoteStatus::Rejected,
            dec!(7.25),
            vec![
                item(5, "Label printer, thermal", dec!(6), dec!(319)),
                item(6, "Thermal labels, 4x6, roll", dec!(120), dec!(11.75)),
            ],
        ),
        quote(
            QUOTE_SUMMIT,
            "Q-2024-005",
            "Summit Legal LLP",
            None,
            date(2023, 11, 30),
            QuoteStatus::Expired,
            dec!(8.5),
            vec![item(7, "Document scanner, duplex", dec!(3), dec!(649))],
        ),
        quote(
            QUOTE_RIVERBEND,
            "Q-2024-006",
            "Riverbend Credit Union",
            Some("Riverbend CU"),
            date(2024, 3, 4),
            QuoteStatus::Accepted,
            dec!(6),
            vec![
                item(8, "Managed print service, per device/month", dec!(18), dec!(32)),
                item(9, "On-site installation", dec!(1), dec!(450)),
            ],
        ),
    ]
}

fn order_item(seed: u128, product: &str, sku: &str, quantity: u32, shipped: bool) -> OrderItem {
    OrderItem {
        id: Uuid::from_u128(0x17e0_0000_0000_4000_8000_0000_0000_0000 | seed),
        product_name: product.to_string(),
        sku: Some(sku.to_string()),
        quantity,
        is_shipped: shipped,
    }
}

fn order(
    id: Uuid,
    number: &str,
    customer: &str,
    placed: NaiveDate,
    status: OrderStatus,
    items: Vec<OrderItem>,
) -> Order {
    Order {
        id,
        order_number: number.to_string(),
        customer_name: customer.to_string(),
        order_date: placed,
        shipping_address: None,
        status,
        items,
    }
}

/// Orders covering every lifecycle state.
pub fn sample_orders() -> Vec<Order> {
    vec![
        order(
            ORDER_PARTIAL,
            "ORD-1001",
            "Lakeside Medical Group",
            date(2024, 3, 1),
            OrderStatus::Processing,
            vec![
                order_item(1, "Toner cartridge, black, high yield", "TN-880", 24, false),
                order_item(2, "Copy paper, letter, 10-ream case", "CP-LTR-10", 40, false),
            ],
        ),
        order(
            ORDER_SINGLE,
            "ORD-1002",
            "Acme Corporation",
            date(2024, 3, 2),
            OrderStatus::Processing,
            vec![order_item(3, "Multifunction laser printer, A3 colour", "MFP-A3C", 10, false)],
        ),
        order(
            ORDER_PENDING,
            "ORD-1003",
            "Pinecrest School District",
            date(2024, 3, 3),
            OrderStatus::Pending,
            vec![order_item(4, "Staples, 5000 count", "ST-5000", 60, false)],
        ),
        order(
            ORDER_SHIPPED,
            "ORD-1004",
            "Northwind Logistics",
            date(2024, 2, 20),
            OrderStatus::Shipped,
            vec![order_item(5, "Thermal labels, 4x6, roll", "TL-4X6", 120, true)],
        ),
        order(
            ORDER_DELIVERED,
            "ORD-1005",
            "Riverbend Credit Union",
            date(2024, 2, 10),
            OrderStatus::Delivered,
            vec![
                order_item(6, "Toner cartridge, cyan", "TN-880C", 4, true),
                order_item(7, "Toner cartridge, magenta", "TN-880M", 4, true),
            ],
        ),
        order(
            ORDER_DELIVERED_EARLIER,
            "ORD-1006",
            "Summit Legal LLP",
            date(2024, 1, 28),
            OrderStatus::Delivered,
            vec![order_item(8, "Document scanner, duplex", "DS-1200", 3, true)],
        ),
        order(
            ORDER_CANCELLED,
            "ORD-1007",
            "Acme Corporation",
            date(2024, 1, 5),
            OrderStatus::Cancelled,
            vec![order_item(9, "Drum unit", "DR-880", 2, false)],
        ),
    ]
}

/// Service agreements for the accepted quotes.
pub fn sample_contracts() -> Vec<Contract> {
    vec![
        Contract {
            id: Uuid::from_u128(0xc0c0_0000_0000_4000_8000_0000_0000_0001),
            contract_number: "SA-2024-001".to_string(),
            quote_id: QUOTE_ACME,
            customer_name: "Acme Corporation".to_string(),
            start_date: date(2024, 2, 1),
            end_date: Some(date(2027, 1, 31)),
            status: ContractStatus::Active,
            monthly_fee: Some(dec!(1250.00)),
            devices_covered: 10,
        },
        Contract {
            id: Uuid::from_u128(0xc0c0_0000_0000_4000_8000_0000_0000_0002),
            contract_number: "SA-2024-002".to_string(),
            quote_id: QUOTE_RIVERBEND,
            customer_name: "Riverbend Credit Union".to_string(),
            start_date: date(2024, 4, 1),
            end_date: Some(date(2026, 3, 31)),
            status: ContractStatus::Pending,
            monthly_fee: Some(dec!(576.00)),
            devices_covered: 18,
        },
        Contract {
            id: Uuid::from_u128(0xc0c0_0000_0000_4000_8000_0000_0000_0003),
            contract_number: "SA-2021-014".to_string(),
            quote_id: Uuid::from_u128(0x5d0e_0000_0000_4000_8000_0000_0000_00ff),
            customer_name: "Summit Legal LLP".to_string(),
            start_date: date(2021, 6, 1),
            end_date: Some(date(2023, 5, 31)),
            status: ContractStatus::Expired,
            monthly_fee: None,
            devices_covered: 4,
        },
    ]
}
