use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    clients::QuoteGateway,
    errors::ServiceError,
    metrics::QUOTES_SAVED,
    models::{dates::normalize_date, LineItem, Quote, QuoteInput, QuoteStatus},
    notifications::{Notice, Notifier},
    services::pricing::{self, PricingPolicy, QuoteTotals},
};

/// Mutable quote draft with totals kept in step with every edit.
///
/// Each mutating call ends in a full recalculation that rebuilds line totals and the
/// rollup from the current items and tax rate.
#[derive(Debug, Clone)]
pub struct QuoteEditor {
    quote_id: Option<Uuid>,
    quote_number: Option<String>,
    status: QuoteStatus,
    customer_name: String,
    customer_email: Option<String>,
    customer_company: Option<String>,
    valid_until: Option<NaiveDate>,
    notes: Option<String>,
    items: Vec<LineItem>,
    tax_rate: Decimal,
    totals: QuoteTotals,
    policy: PricingPolicy,
}

impl QuoteEditor {
    /// Starts a blank draft.
    pub fn new(policy: PricingPolicy, default_tax_rate: Decimal) -> Self {
        Self {
            quote_id: None,
            quote_number: None,
            status: QuoteStatus::Draft,
            customer_name: String::new(),
            customer_email: None,
            customer_company: None,
            valid_until: None,
            notes: None,
            items: Vec::new(),
            tax_rate: default_tax_rate,
            totals: QuoteTotals::default(),
            policy,
        }
    }

    /// Opens an existing quote for editing. Stored totals are ignored and recomputed.
    pub fn from_quote(quote: Quote, policy: PricingPolicy) -> Self {
        let mut editor = Self {
            quote_id: Some(quote.id),
            quote_number: Some(quote.quote_number),
            status: quote.status,
            customer_name: quote.customer_name,
            customer_email: quote.customer_email,
            customer_company: quote.customer_company,
            valid_until: quote.valid_until,
            notes: quote.notes,
            items: quote.items,
            tax_rate: quote.tax_rate,
            totals: QuoteTotals::default(),
            policy,
        };
        editor.recalculate();
        editor
    }

    /// Loads a quote through the gateway and opens it for editing.
    pub async fn load(
        gateway: &dyn QuoteGateway,
        quote_id: Uuid,
        policy: PricingPolicy,
    ) -> Result<Self, ServiceError> {
        let quote = gateway.get_quote(quote_id).await.map_err(|e| {
            error!(quote_id = %quote_id, error = %e, "Failed to load quote for editing");
            e
        })?;
        Ok(Self::from_quote(quote, policy))
    }

    fn recalculate(&mut self) {
        self.totals = pricing::recalculate(&mut self.items, self.tax_rate, &self.policy);
    }

    fn item_mut(&mut self, item_id: Uuid) -> Result<&mut LineItem, ServiceError> {
        self.items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Line item {} not found", item_id)))
    }

    pub fn quote_id(&self) -> Option<Uuid> {
        self.quote_id
    }

    pub fn quote_number(&self) -> Option<&str> {
        self.quote_number.as_deref()
    }

    pub fn status(&self) -> QuoteStatus {
        self.status
    }

    pub fn is_new(&self) -> bool {
        self.quote_id.is_none()
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn valid_until(&self) -> Option<NaiveDate> {
        self.valid_until
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    pub fn totals(&self) -> QuoteTotals {
        self.totals
    }

    pub fn set_customer_name(&mut self, name: impl Into<String>) {
        self.customer_name = name.into();
    }

    pub fn set_customer_email(&mut self, email: Option<String>) {
        self.customer_email = email.filter(|e| !e.trim().is_empty());
    }

    pub fn set_customer_company(&mut self, company: Option<String>) {
        self.customer_company = company.filter(|c| !c.trim().is_empty());
    }

    /// Accepts an ISO date or a timestamp; an empty string clears the date.
    pub fn set_valid_until(&mut self, raw: &str) -> Result<(), ServiceError> {
        self.valid_until = if raw.trim().is_empty() {
            None
        } else {
            Some(normalize_date(raw)?)
        };
        Ok(())
    }

    pub fn set_valid_until_date(&mut self, date: Option<NaiveDate>) {
        self.valid_until = date;
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
    }

    /// Appends a priced item and returns its id.
    pub fn add_item(
        &mut self,
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Result<Uuid, ServiceError> {
        pricing::check_amount("quantity", quantity, &self.policy)?;
        pricing::check_amount("unit_price", unit_price, &self.policy)?;
        let item = LineItem::new(description, quantity, unit_price);
        let id = item.id;
        self.items.push(item);
        self.recalculate();
        Ok(id)
    }

    /// Appends an empty row (quantity 1, price 0) for the operator to fill in.
    pub fn add_blank_item(&mut self) -> Uuid {
        let item = LineItem::blank();
        let id = item.id;
        self.items.push(item);
        self.recalculate();
        id
    }

    /// Removes the item with this id. Other items keep their ids, order and totals.
    pub fn remove_item(&mut self, item_id: Uuid) -> Result<LineItem, ServiceError> {
        let idx = self
            .items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Line item {} not found", item_id)))?;
        let removed = self.items.remove(idx);
        self.recalculate();
        Ok(removed)
    }

    pub fn update_description(
        &mut self,
        item_id: Uuid,
        description: impl Into<String>,
    ) -> Result<(), ServiceError> {
        self.item_mut(item_id)?.description = description.into();
        self.recalculate();
        Ok(())
    }

    pub fn update_quantity(&mut self, item_id: Uuid, quantity: Decimal) -> Result<(), ServiceError> {
        pricing::check_amount("quantity", quantity, &self.policy)?;
        self.item_mut(item_id)?.quantity = quantity;
        self.recalculate();
        Ok(())
    }

    pub fn update_unit_price(
        &mut self,
        item_id: Uuid,
        unit_price: Decimal,
    ) -> Result<(), ServiceError> {
        pricing::check_amount("unit_price", unit_price, &self.policy)?;
        self.item_mut(item_id)?.unit_price = unit_price;
        self.recalculate();
        Ok(())
    }

    pub fn set_tax_rate(&mut self, tax_rate: Decimal) -> Result<(), ServiceError> {
        pricing::check_tax_rate(tax_rate)?;
        self.tax_rate = tax_rate;
        self.recalculate();
        Ok(())
    }

    pub fn to_input(&self) -> QuoteInput {
        QuoteInput {
            customer_name: self.customer_name.trim().to_string(),
            customer_email: self.customer_email.clone(),
            customer_company: self.customer_company.clone(),
            valid_until: self.valid_until,
            items: self.items.iter().map(LineItem::to_input).collect(),
            tax_rate: self.tax_rate,
            notes: self.notes.clone(),
        }
    }

    /// Required-field check run before any submission.
    pub fn validate(&self) -> Result<QuoteInput, ServiceError> {
        let input = self.to_input();
        input.validate_input()?;
        Ok(input)
    }

    /// Creates the quote when the draft is new, updates it otherwise.
    ///
    /// A validation failure blocks the save and nothing is sent. Outcomes are reported
    /// to the notifier; the saved quote replaces the draft's state.
    #[instrument(skip(self, gateway, notifier), fields(quote_id = ?self.quote_id))]
    pub async fn save(
        &mut self,
        gateway: &dyn QuoteGateway,
        notifier: &dyn Notifier,
    ) -> Result<Quote, ServiceError> {
        let input = match self.validate() {
            Ok(input) => input,
            Err(e) => {
                warn!(error = %e, "Quote draft failed validation");
                notifier.notify(Notice::error(e.to_string()));
                return Err(e);
            }
        };

        let result = match self.quote_id {
            Some(id) => gateway.update_quote(id, input).await,
            None => gateway.create_quote(input).await,
        };

        match result {
            Ok(saved) => {
                QUOTES_SAVED.inc();
                info!(quote_number = %saved.quote_number, total = %saved.total, "Quote saved");
                notifier.notify(Notice::success(format!(
                    "Quote {} saved",
                    saved.quote_number
                )));
                *self = Self::from_quote(saved.clone(), self.policy);
                Ok(saved)
            }
            Err(e) => {
                error!(error = %e, "Failed to save quote");
                notifier.notify(Notice::error(format!("Failed to save quote: {}", e)));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clients::InMemoryBackend, notifications::MemoryNotifier};
    use rust_decimal_macros::dec;

    fn editor() -> QuoteEditor {
        QuoteEditor::new(PricingPolicy::default(), dec!(8.5))
    }

    #[test]
    fn totals_follow_every_edit() {
        let mut ed = editor();
        let printer = ed.add_item("Laser printer", dec!(10), dec!(150)).unwrap();
        assert_eq!(ed.totals().subtotal, dec!(1500));
        assert_eq!(ed.totals().tax_amount, dec!(127.5));
        assert_eq!(ed.totals().total, dec!(1627.5));

        ed.update_quantity(printer, dec!(2)).unwrap();
        assert_eq!(ed.items()[0].total(), dec!(300));
        assert_eq!(ed.totals().total, dec!(325.5));

        ed.update_unit_price(printer, dec!(100)).unwrap();
        assert_eq!(ed.totals().subtotal, dec!(200));

        ed.set_tax_rate(dec!(0)).unwrap();
        assert_eq!(ed.totals().tax_amount, dec!(0));
        assert_eq!(ed.totals().total, dec!(200));
    }

    #[test]
    fn removing_keeps_other_items_intact() {
        let mut ed = editor();
        let a = ed.add_item("A", dec!(1), dec!(10)).unwrap();
        let b = ed.add_item("B", dec!(2), dec!(20)).unwrap();
        let c = ed.add_item("C", dec!(3), dec!(30)).unwrap();

        let removed = ed.remove_item(b).unwrap();
        assert_eq!(removed.id, b);
        let ids: Vec<Uuid> = ed.items().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![a, c]);
        assert_eq!(ed.items()[1].total(), dec!(90));
        assert_eq!(ed.totals().subtotal, dec!(100));
    }

    #[test]
    fn unknown_item_is_not_found() {
        let mut ed = editor();
        assert!(matches!(
            ed.remove_item(Uuid::new_v4()),
            Err(ServiceError::NotFound(_))
        ));
        assert!(ed.update_quantity(Uuid::new_v4(), dec!(1)).is_err());
    }

    #[test]
    fn strict_policy_blocks_negative_edits_without_touching_state() {
        let mut ed = QuoteEditor::new(PricingPolicy::strict(), dec!(8.5));
        let id = ed.add_item("Paper", dec!(5), dec!(4)).unwrap();
        assert!(ed.update_quantity(id, dec!(-1)).is_err());
        assert_eq!(ed.items()[0].quantity, dec!(5));
        assert_eq!(ed.totals().subtotal, dec!(20));
    }

    #[test]
    fn blank_rows_count_as_zero_until_priced() {
        let mut ed = editor();
        let id = ed.add_blank_item();
        assert_eq!(ed.totals().subtotal, dec!(0));
        ed.update_unit_price(id, dec!(12.5)).unwrap();
        assert_eq!(ed.totals().subtotal, dec!(12.5));
    }

    #[test]
    fn valid_until_is_normalized() {
        let mut ed = editor();
        ed.set_valid_until("2024-06-30T17:00:00Z").unwrap();
        assert_eq!(ed.valid_until(), NaiveDate::from_ymd_opt(2024, 6, 30));
        ed.set_valid_until("").unwrap();
        assert_eq!(ed.valid_until(), None);
        assert!(ed.set_valid_until("soon").is_err());
    }

    #[tokio::test]
    async fn save_is_blocked_by_missing_fields() {
        let backend = InMemoryBackend::new(PricingPolicy::default());
        let notifier = MemoryNotifier::new();
        let mut ed = editor();
        ed.add_item("Toner", dec!(1), dec!(80)).unwrap();

        let result = ed.save(&backend, &notifier).await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
        assert!(backend.list_quotes().await.unwrap().is_empty());
        assert_eq!(
            notifier.last().unwrap().level,
            crate::notifications::NoticeLevel::Error
        );
    }

    #[tokio::test]
    async fn save_creates_then_updates() {
        let backend = InMemoryBackend::new(PricingPolicy::default());
        let notifier = MemoryNotifier::new();
        let mut ed = editor();
        ed.set_customer_name("Acme Corporation");
        let id = ed.add_item("Laser printer", dec!(10), dec!(150)).unwrap();

        let created = ed.save(&backend, &notifier).await.unwrap();
        assert_eq!(created.total, dec!(1627.5));
        assert_eq!(ed.quote_id(), Some(created.id));

        ed.update_quantity(id, dec!(12)).unwrap();
        let updated = ed.save(&backend, &notifier).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.subtotal, dec!(1800));
        assert_eq!(backend.list_quotes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_save_keeps_the_draft() {
        let backend = InMemoryBackend::new(PricingPolicy::default());
        let notifier = MemoryNotifier::new();
        let mut ed = editor();
        ed.set_customer_name("Acme Corporation");
        ed.add_item("Laser printer", dec!(1), dec!(150)).unwrap();

        backend.fail_next_writes(1);
        assert!(ed.save(&backend, &notifier).await.is_err());
        assert!(ed.is_new());
        assert_eq!(ed.totals().subtotal, dec!(150));
        assert!(notifier.last().unwrap().message.contains("Failed to save quote"));
    }
}
