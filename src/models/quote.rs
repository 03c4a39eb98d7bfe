use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::dates::{iso_date, optional_iso_date};
use super::line_item::{LineItem, LineItemInput};
use crate::errors::ServiceError;

/// Lifecycle status of a quote. Transitions are set from outside and any status may
/// follow any other.
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
pub enum QuoteStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
    Expired,
}

/// A priced proposal to a customer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: Uuid,
    pub quote_number: String,
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_company: Option<String>,
    #[serde(with = "iso_date")]
    pub issue_date: NaiveDate,
    #[serde(default, with = "optional_iso_date")]
    pub valid_until: Option<NaiveDate>,
    pub status: QuoteStatus,
    pub items: Vec<LineItem>,
    /// Tax rate as a percentage, e.g. `8.5` for 8.5%.
    pub tax_rate: Decimal,
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub tax_amount: Decimal,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Create/update payload for a quote.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct QuoteInput {
    #[validate(length(min = 1, message = "Customer name is required"))]
    pub customer_name: String,
    #[validate(email(message = "Customer email is not a valid address"))]
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_company: Option<String>,
    #[serde(default, with = "optional_iso_date")]
    pub valid_until: Option<NaiveDate>,
    #[validate(length(min = 1, message = "At least one line item is required"))]
    pub items: Vec<LineItemInput>,
    pub tax_rate: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

impl QuoteInput {
    /// Runs field validation for the quote and each of its line items.
    pub fn validate_input(&self) -> Result<(), ServiceError> {
        self.validate()?;
        for (idx, item) in self.items.iter().enumerate() {
            item.validate().map_err(|e| {
                ServiceError::ValidationError(format!("items[{}]: {}", idx, e))
            })?;
        }
        Ok(())
    }
}

impl Quote {
    pub fn item(&self, item_id: Uuid) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn to_input(&self) -> QuoteInput {
        QuoteInput {
            customer_name: self.customer_name.clone(),
            customer_email: self.customer_email.clone(),
            customer_company: self.customer_company.clone(),
            valid_until: self.valid_until,
            items: self.items.iter().map(LineItem::to_input).collect(),
            tax_rate: self.tax_rate,
            notes: self.notes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    fn input() -> QuoteInput {
        QuoteInput {
            customer_name: "Acme Corp".into(),
            customer_email: Some("buyer@acme.test".into()),
            customer_company: None,
            valid_until: None,
            items: vec![LineItemInput {
                id: None,
                description: "Toner cartridge".into(),
                quantity: dec!(2),
                unit_price: dec!(89.99),
            }],
            tax_rate: dec!(8.5),
            notes: None,
        }
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!(QuoteStatus::from_str("Accepted").unwrap(), QuoteStatus::Accepted);
        assert_eq!(QuoteStatus::Expired.to_string(), "expired");
        assert!(QuoteStatus::from_str("converted").is_err());
    }

    #[test]
    fn valid_input_passes() {
        assert!(input().validate_input().is_ok());
    }

    #[test]
    fn missing_customer_name_is_rejected() {
        let mut payload = input();
        payload.customer_name.clear();
        assert!(matches!(
            payload.validate_input(),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn empty_item_list_is_rejected() {
        let mut payload = input();
        payload.items.clear();
        assert!(payload.validate_input().is_err());
    }

    #[test]
    fn blank_item_description_is_rejected() {
        let mut payload = input();
        payload.items[0].description.clear();
        let err = payload.validate_input().unwrap_err();
        assert!(err.to_string().contains("items[0]"));
    }

    #[test]
    fn bad_email_is_rejected() {
        let mut payload = input();
        payload.customer_email = Some("not-an-email".into());
        assert!(payload.validate_input().is_err());
    }

    #[test]
    fn quote_accepts_timestamp_dates_and_writes_plain_dates() {
        let raw = serde_json::json!({
            "id": "6f9619ff-8b86-d011-b42d-00cf4fc964ff",
            "quote_number": "Q-2024-010",
            "customer_name": "Blue Ridge Dental",
            "issue_date": "2024-05-01T14:22:00Z",
            "valid_until": "2024-05-31",
            "status": "sent",
            "items": [],
            "tax_rate": "7.25"
        });
        let quote: Quote = serde_json::from_value(raw).unwrap();
        let back = serde_json::to_value(&quote).unwrap();
        assert_eq!(back["issue_date"], "2024-05-01");
        assert_eq!(back["valid_until"], "2024-05-31");
    }
}
