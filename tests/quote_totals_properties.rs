//! Property-based tests for quote totals and the quote filter.
//!
//! The editor is driven through random edit sequences and the rollup is checked
//! against the items after every step.

use proptest::prelude::*;
use rust_decimal::Decimal;
use supplydesk::{
    fixtures,
    models::QuoteStatus,
    services::{
        pricing::PricingPolicy,
        quote_editor::QuoteEditor,
        quote_tracker::{filter_quotes, QuoteFilter, StatusFilter},
    },
};

// Strategies for generating test data
fn money_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_00).prop_map(|cents| Decimal::new(cents, 2))
}

fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000, 0u32..3).prop_map(|(raw, scale)| Decimal::new(raw, scale))
}

fn tax_rate_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..3_000).prop_map(|basis| Decimal::new(basis, 2))
}

#[derive(Clone, Debug)]
enum Edit {
    Add(Decimal, Decimal),
    SetQuantity(usize, Decimal),
    SetPrice(usize, Decimal),
    Remove(usize),
    SetTaxRate(Decimal),
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        3 => (quantity_strategy(), money_strategy()).prop_map(|(q, p)| Edit::Add(q, p)),
        2 => (any::<usize>(), quantity_strategy()).prop_map(|(i, q)| Edit::SetQuantity(i, q)),
        2 => (any::<usize>(), money_strategy()).prop_map(|(i, p)| Edit::SetPrice(i, p)),
        1 => any::<usize>().prop_map(Edit::Remove),
        1 => tax_rate_strategy().prop_map(Edit::SetTaxRate),
    ]
}

fn apply(editor: &mut QuoteEditor, edit: &Edit) {
    let ids: Vec<_> = editor.items().iter().map(|item| item.id).collect();
    let pick = |i: usize| (!ids.is_empty()).then(|| ids[i % ids.len()]);
    match edit {
        Edit::Add(q, p) => {
            editor.add_item("Item", *q, *p).unwrap();
        }
        Edit::SetQuantity(i, q) => {
            if let Some(id) = pick(*i) {
                editor.update_quantity(id, *q).unwrap();
            }
        }
        Edit::SetPrice(i, p) => {
            if let Some(id) = pick(*i) {
                editor.update_unit_price(id, *p).unwrap();
            }
        }
        Edit::Remove(i) => {
            if let Some(id) = pick(*i) {
                editor.remove_item(id).unwrap();
            }
        }
        Edit::SetTaxRate(rate) => editor.set_tax_rate(*rate).unwrap(),
    }
}

// Property: with exact arithmetic the rollup is the plain sum after any edit sequence
proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn exact_rollup_matches_items(
        rate in tax_rate_strategy(),
        edits in prop::collection::vec(edit_strategy(), 1..40),
    ) {
        let mut editor = QuoteEditor::new(PricingPolicy::exact(), rate);
        for edit in &edits {
            apply(&mut editor, edit);

            let expected: Decimal = editor
                .items()
                .iter()
                .map(|item| item.quantity * item.unit_price)
                .sum();
            let totals = editor.totals();
            prop_assert_eq!(totals.subtotal, expected);
            prop_assert_eq!(
                totals.tax_amount,
                totals.subtotal * editor.tax_rate() / Decimal::ONE_HUNDRED
            );
            prop_assert_eq!(totals.total, totals.subtotal + totals.tax_amount);
        }
    }

    #[test]
    fn rounded_rollup_is_consistent(
        rate in tax_rate_strategy(),
        edits in prop::collection::vec(edit_strategy(), 1..40),
    ) {
        let mut editor = QuoteEditor::new(PricingPolicy::default(), rate);
        for edit in &edits {
            apply(&mut editor, edit);

            let totals = editor.totals();
            let line_sum: Decimal = editor.items().iter().map(|item| item.total()).sum();
            prop_assert_eq!(totals.subtotal, line_sum);
            prop_assert_eq!(
                totals.tax_amount,
                totals.subtotal * editor.tax_rate() / Decimal::ONE_HUNDRED
            );
            prop_assert_eq!(totals.total, totals.subtotal + totals.tax_amount);
        }
    }
}

// Property: removing one row leaves the others untouched
proptest! {
    #[test]
    fn removal_keeps_other_rows(
        rows in prop::collection::vec((quantity_strategy(), money_strategy()), 1..20),
        victim in any::<usize>(),
    ) {
        let mut editor = QuoteEditor::new(PricingPolicy::default(), Decimal::new(85, 1));
        for (q, p) in &rows {
            editor.add_item("Item", *q, *p).unwrap();
        }
        let before = editor.items().to_vec();
        let index = victim % before.len();

        editor.remove_item(before[index].id).unwrap();

        let after = editor.items();
        prop_assert_eq!(after.len(), before.len() - 1);
        let expected: Vec<_> = before
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, item)| (item.id, item.total()))
            .collect();
        let actual: Vec<_> = after.iter().map(|item| (item.id, item.total())).collect();
        prop_assert_eq!(actual, expected);
    }
}

fn status_strategy() -> impl Strategy<Value = StatusFilter> {
    prop_oneof![
        Just(StatusFilter::All),
        Just(StatusFilter::Only(QuoteStatus::Draft)),
        Just(StatusFilter::Only(QuoteStatus::Sent)),
        Just(StatusFilter::Only(QuoteStatus::Accepted)),
        Just(StatusFilter::Only(QuoteStatus::Rejected)),
        Just(StatusFilter::Only(QuoteStatus::Expired)),
    ]
}

// Property: filtering is a pure subset selection that preserves order
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn filter_returns_exactly_matching_quotes(
        status in status_strategy(),
        query in "[a-zA-Z0-9 -]{0,8}",
    ) {
        let quotes = fixtures::sample_quotes();
        let filter = QuoteFilter::new(status, query.clone());
        let found = filter_quotes(&quotes, &filter);

        let needle = query.trim().to_lowercase();
        let expected: Vec<_> = quotes
            .iter()
            .filter(|q| status.matches(q.status))
            .filter(|q| {
                needle.is_empty()
                    || q.quote_number.to_lowercase().contains(&needle)
                    || q.customer_name.to_lowercase().contains(&needle)
            })
            .map(|q| q.id)
            .collect();
        let actual: Vec<_> = found.iter().map(|q| q.id).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn query_case_does_not_matter(query in "[a-zA-Z]{1,6}") {
        let quotes = fixtures::sample_quotes();
        let lower = filter_quotes(&quotes, &QuoteFilter::new(StatusFilter::All, query.to_lowercase())).len();
        let upper = filter_quotes(&quotes, &QuoteFilter::new(StatusFilter::All, query.to_uppercase())).len();
        prop_assert_eq!(lower, upper);
    }
}
