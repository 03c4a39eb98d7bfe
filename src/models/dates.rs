//! Date handling shared by quotes, orders and contracts.
//!
//! The backend and older exports send dates either as plain ISO dates or as full
//! timestamps. Everything is normalized to a calendar date and written back out
//! as `YYYY-MM-DD`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serializer};

use crate::errors::ServiceError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses an ISO date, an RFC 3339 timestamp or a naive `YYYY-MM-DDTHH:MM:SS`
/// timestamp into a calendar date.
pub fn normalize_date(raw: &str) -> Result<NaiveDate, ServiceError> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Ok(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(ts.date());
        }
    }
    Err(ServiceError::ValidationError(format!(
        "Unrecognized date '{}', expected YYYY-MM-DD",
        raw
    )))
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// `#[serde(with = "iso_date")]` for required date fields.
pub mod iso_date {
    use super::*;

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_date(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        normalize_date(&raw).map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "optional_iso_date")]` for optional date fields.
pub mod optional_iso_date {
    use super::*;

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_some(&format_date(date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !raw.trim().is_empty() => normalize_date(&raw)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2024-03-15")]
    #[case("2024-03-15T09:30:00Z")]
    #[case("2024-03-15T23:59:59.123+00:00")]
    #[case("2024-03-15T08:00:00")]
    #[case(" 2024-03-15 ")]
    fn accepts_dates_and_timestamps(#[case] raw: &str) {
        let date = normalize_date(raw).expect("date should parse");
        assert_eq!(format_date(&date), "2024-03-15");
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            normalize_date("next tuesday"),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn offset_timestamps_keep_their_local_date() {
        let date = normalize_date("2024-03-15T23:30:00-05:00").unwrap();
        assert_eq!(format_date(&date), "2024-03-15");
    }
}
