use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

use supplydesk::{
    models::LineItem,
    services::{
        pricing::{compute_totals, recalculate, PricingPolicy},
        quote_tracker::{filter_quotes, QuoteFilter, StatusFilter},
    },
};

fn items(count: usize) -> Vec<LineItem> {
    (0..count)
        .map(|i| {
            LineItem::new(
                format!("Item {}", i),
                Decimal::from(i as u64 % 17 + 1),
                dec!(19.99) + Decimal::from(i as u64),
            )
        })
        .collect()
}

// Totals over quotes of increasing size
fn totals_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("quote_totals");
    let policy = PricingPolicy::default();

    for size in [1usize, 10, 100, 1000].iter() {
        let lines = items(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &lines, |b, lines| {
            b.iter(|| compute_totals(black_box(lines), black_box(dec!(8.5)), &policy));
        });
    }

    group.finish();
}

// Full recalculation after an edit, including per-line totals
fn recalculate_benchmark(c: &mut Criterion) {
    let policy = PricingPolicy::default();
    let mut lines = items(100);
    c.bench_function("recalculate_100_lines", |b| {
        b.iter(|| recalculate(black_box(&mut lines), dec!(8.5), &policy));
    });
}

fn filter_benchmark(c: &mut Criterion) {
    let quotes: Vec<_> = (0..200)
        .flat_map(|_| supplydesk::fixtures::sample_quotes())
        .collect();
    let filter = QuoteFilter::new(StatusFilter::All, "medical");
    c.bench_function("filter_1200_quotes", |b| {
        b.iter(|| filter_quotes(black_box(&quotes), &filter).len());
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = totals_benchmark, recalculate_benchmark, filter_benchmark
}
criterion_main!(benches);
