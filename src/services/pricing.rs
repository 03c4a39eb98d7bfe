//! Line-item recalculation engine.
//!
//! Quote rollups are always recomputed from scratch from the item sequence and the
//! tax rate. Nothing is patched incrementally, so a stale subtotal cannot survive an
//! edit.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{errors::ServiceError, models::LineItem};

/// Handling of negative quantities and unit prices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountPolicy {
    /// Accept silently; negative rows simply reduce the subtotal.
    #[default]
    Accept,
    /// Refuse the edit with a validation error.
    Reject,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Decimal places kept for line totals. `None` keeps exact arithmetic.
    pub currency_precision: Option<u32>,
    pub negative_amounts: AmountPolicy,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            currency_precision: Some(2),
            negative_amounts: AmountPolicy::Accept,
        }
    }
}

impl PricingPolicy {
    pub fn exact() -> Self {
        Self {
            currency_precision: None,
            ..Self::default()
        }
    }

    pub fn strict() -> Self {
        Self {
            negative_amounts: AmountPolicy::Reject,
            ..Self::default()
        }
    }

    fn round(&self, amount: Decimal) -> Decimal {
        match self.currency_precision {
            Some(dp) => amount.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero),
            None => amount,
        }
    }
}

/// Derived rollup of a quote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

pub fn line_total(quantity: Decimal, unit_price: Decimal, policy: &PricingPolicy) -> Decimal {
    policy.round(quantity * unit_price)
}

/// Tax on a subtotal, with `tax_rate` given as a percentage. Never rounded.
pub fn tax_amount(subtotal: Decimal, tax_rate: Decimal) -> Decimal {
    subtotal * tax_rate / Decimal::ONE_HUNDRED
}

/// Computes the rollup from quantities and prices without touching the items.
pub fn compute_totals(items: &[LineItem], tax_rate: Decimal, policy: &PricingPolicy) -> QuoteTotals {
    let subtotal: Decimal = items
        .iter()
        .map(|item| line_total(item.quantity, item.unit_price, policy))
        .sum();
    let tax_amount = tax_amount(subtotal, tax_rate);
    QuoteTotals {
        subtotal,
        tax_amount,
        total: subtotal + tax_amount,
    }
}

/// Refreshes every stored line total and returns the rollup.
pub fn recalculate(items: &mut [LineItem], tax_rate: Decimal, policy: &PricingPolicy) -> QuoteTotals {
    for item in items.iter_mut() {
        let total = line_total(item.quantity, item.unit_price, policy);
        item.set_total(total);
    }
    compute_totals(items, tax_rate, policy)
}

/// Enforces the negative-amount policy for a single value.
pub fn check_amount(field: &str, value: Decimal, policy: &PricingPolicy) -> Result<(), ServiceError> {
    if policy.negative_amounts == AmountPolicy::Reject && value.is_sign_negative() && !value.is_zero() {
        return Err(ServiceError::ValidationError(format!(
            "{} must not be negative (got {})",
            field, value
        )));
    }
    Ok(())
}

/// Tax rates are percentages and are never allowed below zero.
pub fn check_tax_rate(tax_rate: Decimal) -> Result<(), ServiceError> {
    if tax_rate.is_sign_negative() && !tax_rate.is_zero() {
        return Err(ServiceError::ValidationError(format!(
            "Tax rate must not be negative (got {})",
            tax_rate
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(qty: Decimal, price: Decimal) -> LineItem {
        LineItem::new("row", qty, price)
    }

    #[test]
    fn sample_fixture_totals() {
        let mut items = vec![item(dec!(10), dec!(150))];
        let totals = recalculate(&mut items, dec!(8.5), &PricingPolicy::default());
        assert_eq!(items[0].total(), dec!(1500));
        assert_eq!(totals.subtotal, dec!(1500));
        assert_eq!(totals.tax_amount, dec!(127.5));
        assert_eq!(totals.total, dec!(1627.5));
    }

    #[test]
    fn empty_quote_is_zero() {
        let totals = compute_totals(&[], dec!(8.5), &PricingPolicy::default());
        assert_eq!(totals, QuoteTotals::default());
    }

    #[test]
    fn line_totals_round_half_away_from_zero() {
        let policy = PricingPolicy::default();
        assert_eq!(line_total(dec!(3), dec!(0.335), &policy), dec!(1.01));
        assert_eq!(line_total(dec!(1), dec!(0.125), &policy), dec!(0.13));
        assert_eq!(line_total(dec!(-1), dec!(0.125), &policy), dec!(-0.13));
    }

    #[test]
    fn exact_policy_keeps_all_places() {
        let policy = PricingPolicy::exact();
        assert_eq!(line_total(dec!(3), dec!(0.335), &policy), dec!(1.005));
        assert_eq!(tax_amount(dec!(10.01), dec!(7.25)), dec!(0.725725));
    }

    #[test]
    fn tax_is_exact_on_the_rounded_subtotal() {
        let mut items = vec![item(dec!(1), dec!(19.99)), item(dec!(3), dec!(4.15))];
        let totals = recalculate(&mut items, dec!(7.25), &PricingPolicy::default());
        assert_eq!(totals.subtotal, dec!(32.44));
        assert_eq!(totals.tax_amount, dec!(2.3519));
        assert_eq!(totals.total, dec!(34.7919));
    }

    #[test]
    fn negative_amounts_accepted_by_default() {
        let policy = PricingPolicy::default();
        assert!(check_amount("quantity", dec!(-2), &policy).is_ok());

        let mut items = vec![item(dec!(2), dec!(50)), item(dec!(-1), dec!(50))];
        let totals = recalculate(&mut items, Decimal::ZERO, &policy);
        assert_eq!(totals.subtotal, dec!(50));
    }

    #[test]
    fn strict_policy_rejects_negative_amounts() {
        let policy = PricingPolicy::strict();
        assert!(matches!(
            check_amount("unit_price", dec!(-0.01), &policy),
            Err(ServiceError::ValidationError(_))
        ));
        assert!(check_amount("unit_price", Decimal::ZERO, &policy).is_ok());
    }

    #[test]
    fn negative_tax_rate_is_refused() {
        assert!(check_tax_rate(dec!(-1)).is_err());
        assert!(check_tax_rate(Decimal::ZERO).is_ok());
    }
}
