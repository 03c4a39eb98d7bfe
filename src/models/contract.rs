use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dates::{iso_date, optional_iso_date};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ContractStatus {
    Pending,
    Active,
    Expired,
    Terminated,
}

/// A signed service agreement derived from an accepted quote.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    pub contract_number: String,
    pub quote_id: Uuid,
    pub customer_name: String,
    #[serde(with = "iso_date")]
    pub start_date: NaiveDate,
    #[serde(default, with = "optional_iso_date")]
    pub end_date: Option<NaiveDate>,
    pub status: ContractStatus,
    /// Recurring service fee for managed-print agreements.
    #[serde(default)]
    pub monthly_fee: Option<Decimal>,
    #[serde(default)]
    pub devices_covered: u32,
}
