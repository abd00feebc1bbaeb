//! Criterion benchmarks for the compiler hot paths.
//!
//! Benchmarks:
//! 1. Full compile of a realistic conditional/filter tree across history sizes
//! 2. Indicator kernel batch (the nine kinds over one long series)
//! 3. Alignment and allocation validation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeMap;

use symphony_core::indicators::{compute, IndicatorKind};
use symphony_core::{align_and_check, compile, parse_str, PriceTable, StrategyNode};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_prices(tickers: &[&str], n: usize) -> PriceTable {
    let base = chrono::NaiveDate::from_ymd_opt(2015, 1, 2).unwrap();
    let dates: Vec<chrono::NaiveDate> =
        (0..n).map(|i| base + chrono::Duration::days(i as i64)).collect();
    let closes: BTreeMap<String, Vec<f64>> = tickers
        .iter()
        .enumerate()
        .map(|(k, t)| {
            let series = (0..n)
                .map(|i| 100.0 + k as f64 * 10.0 + (i as f64 * (0.1 + k as f64 * 0.03)).sin() * 8.0)
                .collect();
            (t.to_string(), series)
        })
        .collect();
    PriceTable::from_columns(dates, closes)
}

fn make_tree() -> StrategyNode {
    parse_str(
        r#"{
            "kind": "condition",
            "predicate": {
                "type": "comparison",
                "lhs": {"ticker": "SPY", "indicator": "cumulative-return", "window": 60},
                "op": "gt",
                "rhs": 0.0
            },
            "then": {
                "kind": "filter",
                "sort": {"indicator": "relative-strength-index", "window": 14},
                "select": {"direction": "top", "count": 2},
                "children": [
                    {"kind": "asset", "ticker": "QQQ"},
                    {"kind": "asset", "ticker": "XLK"},
                    {"kind": "asset", "ticker": "XLE"},
                    {"kind": "asset", "ticker": "XLV"}
                ]
            },
            "else": {
                "kind": "group",
                "weighting": {"rule": "inverse-volatility", "window": 20},
                "children": [
                    {"kind": "asset", "ticker": "TLT"},
                    {"kind": "asset", "ticker": "SHY"}
                ]
            }
        }"#,
    )
    .unwrap()
}

const TICKERS: &[&str] = &["SPY", "QQQ", "XLK", "XLE", "XLV", "TLT", "SHY"];

// ── 1. Full compile ──────────────────────────────────────────────────

fn bench_compile(c: &mut Criterion) {
    let tree = make_tree();
    let mut group = c.benchmark_group("compile");
    for &n in &[252_usize, 1_260, 5_040] {
        let prices = make_prices(TICKERS, n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| compile(black_box(&tree), black_box(&prices)).unwrap());
        });
    }
    group.finish();
}

// ── 2. Indicator kernels ─────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let n = 5_040;
    let closes: Vec<f64> = (0..n).map(|i| 100.0 + (i as f64 * 0.07).sin() * 12.0).collect();
    let kinds = [
        IndicatorKind::CurrentPrice,
        IndicatorKind::CumulativeReturn,
        IndicatorKind::MovingAveragePrice,
        IndicatorKind::ExponentialMovingAveragePrice,
        IndicatorKind::StandardDeviationPrice,
        IndicatorKind::RelativeStrengthIndex,
        IndicatorKind::StandardDeviationReturn,
        IndicatorKind::MovingAverageReturn,
        IndicatorKind::MaxDrawdown,
    ];

    c.bench_function("indicators/batch_5040", |b| {
        b.iter(|| {
            for kind in kinds {
                let window = if kind.is_windowed() { 20 } else { 0 };
                black_box(compute(black_box(&closes), kind, window).unwrap());
            }
        });
    });
}

// ── 3. Align and validate ────────────────────────────────────────────

fn bench_align(c: &mut Criterion) {
    let tree = make_tree();
    let prices = make_prices(TICKERS, 5_040);
    let compiled = compile(&tree, &prices).unwrap();

    c.bench_function("align/5040", |b| {
        b.iter(|| {
            align_and_check(black_box(compiled.clone()), black_box(&prices), &tree).unwrap()
        });
    });
}

criterion_group!(benches, bench_compile, bench_indicators, bench_align);
criterion_main!(benches);
