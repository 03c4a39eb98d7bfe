use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use strum::IntoEnumIterator;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    clients::QuoteGateway,
    errors::ServiceError,
    models::{Quote, QuoteStatus},
    notifications::{Notice, Notifier},
};

/// Status half of the tracker filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(QuoteStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: QuoteStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        QuoteStatus::from_str(trimmed)
            .map(StatusFilter::Only)
            .map_err(|_| ServiceError::InvalidStatus(format!("Unknown quote status: {}", s)))
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("all"),
            StatusFilter::Only(status) => write!(f, "{}", status),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuoteFilter {
    pub status: StatusFilter,
    pub query: String,
}

impl QuoteFilter {
    pub fn new(status: StatusFilter, query: impl Into<String>) -> Self {
        Self {
            status,
            query: query.into(),
        }
    }

    pub fn matches(&self, quote: &Quote) -> bool {
        if !self.status.matches(quote.status) {
            return false;
        }
        let needle = self.query.trim().to_lowercase();
        needle.is_empty()
            || quote.quote_number.to_lowercase().contains(&needle)
            || quote.customer_name.to_lowercase().contains(&needle)
    }
}

/// Quotes matching the filter, in their original order.
pub fn filter_quotes<'a>(quotes: &'a [Quote], filter: &QuoteFilter) -> Vec<&'a Quote> {
    quotes.iter().filter(|quote| filter.matches(quote)).collect()
}

/// Number of quotes per status, with every status present.
pub fn status_counts(quotes: &[Quote]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> =
        QuoteStatus::iter().map(|s| (s.to_string(), 0)).collect();
    for quote in quotes {
        *counts.entry(quote.status.to_string()).or_default() += 1;
    }
    counts
}

/// List view over the quote book: loads quotes, filters them and dispatches status
/// changes.
pub struct QuoteTracker {
    gateway: Arc<dyn QuoteGateway>,
    notifier: Arc<dyn Notifier>,
    quotes: Vec<Quote>,
    filter: QuoteFilter,
    error_banner: Option<String>,
}

impl QuoteTracker {
    pub fn new(gateway: Arc<dyn QuoteGateway>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            gateway,
            notifier,
            quotes: Vec::new(),
            filter: QuoteFilter::default(),
            error_banner: None,
        }
    }

    /// Reloads the quote list. On failure the previous list stays in place and the
    /// error is kept for display.
    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> Result<(), ServiceError> {
        match self.gateway.list_quotes().await {
            Ok(quotes) => {
                info!(count = quotes.len(), "Quotes loaded");
                self.quotes = quotes;
                self.error_banner = None;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to load quotes");
                self.error_banner = Some(format!("Could not load quotes: {}", e));
                self.notifier
                    .notify(Notice::error(format!("Failed to load quotes: {}", e)));
                Err(e)
            }
        }
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) {
        self.filter.status = status;
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.filter.query = query.into();
    }

    pub fn filter(&self) -> &QuoteFilter {
        &self.filter
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn visible(&self) -> Vec<&Quote> {
        filter_quotes(&self.quotes, &self.filter)
    }

    pub fn status_counts(&self) -> BTreeMap<String, usize> {
        status_counts(&self.quotes)
    }

    pub fn error_banner(&self) -> Option<&str> {
        self.error_banner.as_deref()
    }

    /// Sends a status change for one quote. Any status may be set from any other.
    ///
    /// On success the local copy is replaced with the backend's answer. On failure the
    /// list is re-fetched so it reflects what the backend actually holds.
    #[instrument(skip(self), fields(quote_id = %quote_id, status = %status))]
    pub async fn change_status(
        &mut self,
        quote_id: Uuid,
        status: QuoteStatus,
    ) -> Result<Quote, ServiceError> {
        match self.gateway.update_quote_status(quote_id, status).await {
            Ok(updated) => {
                if let Some(slot) = self.quotes.iter_mut().find(|q| q.id == quote_id) {
                    *slot = updated.clone();
                } else {
                    self.quotes.push(updated.clone());
                }
                info!(quote_number = %updated.quote_number, "Quote status changed");
                self.notifier.notify(Notice::success(format!(
                    "Quote {} marked {}",
                    updated.quote_number, status
                )));
                Ok(updated)
            }
            Err(e) => {
                warn!(error = %e, "Quote status change failed; reloading quotes");
                self.notifier
                    .notify(Notice::error(format!("Failed to update quote: {}", e)));
                if let Err(reload) = self.refresh().await {
                    error!(error = %reload, "Reload after failed status change also failed");
                }
                Err(e)
            }
        }
    }
}
