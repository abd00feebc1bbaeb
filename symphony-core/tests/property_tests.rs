//! Property tests for compiler invariants.
//!
//! Uses proptest to verify:
//! 1. Full-allocation conservation — once a tree allocates anything on a
//!    date, the row sums to exactly the routed weight
//! 2. Conditional exclusivity — then/else trackers are never both nonzero
//! 3. Filter cardinality — a filter never selects more than `count`
//! 4. Determinism — compiling the same inputs twice yields equal matrices

use chrono::NaiveDate;
use proptest::prelude::*;
use std::collections::BTreeMap;
use symphony_core::{compile, parse_str, PriceTable};

// ── Strategies (proptest) ────────────────────────────────────────────

/// A positive random-walk close series of length `len`.
fn arb_closes(len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.04..0.04_f64, len).prop_map(|steps| {
        let mut price = 100.0;
        steps
            .iter()
            .map(|s| {
                price *= 1.0 + s;
                price
            })
            .collect()
    })
}

fn arb_window() -> impl Strategy<Value = usize> {
    2..15_usize
}

fn make_prices(columns: Vec<(&str, Vec<f64>)>) -> PriceTable {
    let n = columns[0].1.len();
    let base = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    let dates: Vec<NaiveDate> =
        (0..n).map(|i| base + chrono::Duration::days(i as i64)).collect();
    let closes: BTreeMap<String, Vec<f64>> = columns
        .into_iter()
        .map(|(t, c)| (t.to_string(), c))
        .collect();
    PriceTable::from_columns(dates, closes)
}

const LEN: usize = 60;

// ── 1. Full-allocation conservation ──────────────────────────────────

proptest! {
    /// Whatever a conditional-over-groups tree allocates, each date's row
    /// sums to either 0 (nothing allocatable yet) or 1.
    #[test]
    fn allocation_rows_sum_to_zero_or_one(
        spy in arb_closes(LEN),
        a in arb_closes(LEN),
        b in arb_closes(LEN),
        shy in arb_closes(LEN),
        window in arb_window(),
    ) {
        let doc = format!(
            r#"{{
                "kind": "condition",
                "predicate": {{
                    "type": "comparison",
                    "lhs": {{"ticker": "SPY", "indicator": "cumulative-return", "window": {window}}},
                    "op": "gt",
                    "rhs": 0.0
                }},
                "then": {{
                    "kind": "group",
                    "weighting": {{"rule": "equal"}},
                    "children": [
                        {{"kind": "asset", "ticker": "A"}},
                        {{"kind": "asset", "ticker": "B"}}
                    ]
                }},
                "else": {{"kind": "asset", "ticker": "SHY"}}
            }}"#
        );
        let tree = parse_str(&doc).unwrap();
        let prices = make_prices(vec![("SPY", spy), ("A", a), ("B", b), ("SHY", shy)]);
        let compiled = compile(&tree, &prices).unwrap();

        for t in 0..LEN {
            let sum = compiled.allocations.row_sum(t);
            prop_assert!(
                (sum - 1.0).abs() < 1e-9 || sum.abs() < 1e-9,
                "row {} sums to {}", t, sum
            );
        }
    }

    /// Explicit weights are conserved through nesting: a 0.3/0.7 split over
    /// two equal-weight pairs still sums to 1 on every date.
    #[test]
    fn nested_explicit_weights_are_conserved(
        a in arb_closes(LEN),
        b in arb_closes(LEN),
        c in arb_closes(LEN),
        d in arb_closes(LEN),
    ) {
        let tree = parse_str(
            r#"{
                "kind": "group",
                "weighting": {"rule": "explicit", "weights": [0.3, 0.7]},
                "children": [
                    {
                        "kind": "group",
                        "weighting": {"rule": "equal"},
                        "children": [
                            {"kind": "asset", "ticker": "A"},
                            {"kind": "asset", "ticker": "B"}
                        ]
                    },
                    {
                        "kind": "group",
                        "weighting": {"rule": "equal"},
                        "children": [
                            {"kind": "asset", "ticker": "C"},
                            {"kind": "asset", "ticker": "D"}
                        ]
                    }
                ]
            }"#,
        )
        .unwrap();
        let prices = make_prices(vec![("A", a), ("B", b), ("C", c), ("D", d)]);
        let compiled = compile(&tree, &prices).unwrap();

        for t in 0..LEN {
            prop_assert!((compiled.allocations.row_sum(t) - 1.0).abs() < 1e-9);
            prop_assert!((compiled.allocations.column("A").unwrap()[t] - 0.15).abs() < 1e-9);
            prop_assert!((compiled.allocations.column("C").unwrap()[t] - 0.35).abs() < 1e-9);
        }
    }
}

// ── 2. Conditional exclusivity ───────────────────────────────────────

proptest! {
    /// The then and else trackers of one conditional are never both nonzero
    /// on the same date, and exactly one is active while the parent is.
    #[test]
    fn conditional_branches_are_exclusive(
        spy in arb_closes(LEN),
        window in arb_window(),
        threshold in -5.0..5.0_f64,
    ) {
        let doc = format!(
            r#"{{
                "kind": "condition",
                "predicate": {{
                    "type": "comparison",
                    "lhs": {{"ticker": "SPY", "indicator": "cumulative-return", "window": {window}}},
                    "op": "gt",
                    "rhs": {threshold}
                }},
                "then": {{"kind": "asset", "id": "leaf-then", "ticker": "QQQ"}},
                "else": {{"kind": "asset", "id": "leaf-else", "ticker": "SHY"}}
            }}"#
        );
        let tree = parse_str(&doc).unwrap();
        let prices = make_prices(vec![
            ("SPY", spy),
            ("QQQ", vec![100.0; LEN]),
            ("SHY", vec![100.0; LEN]),
        ]);
        let compiled = compile(&tree, &prices).unwrap();
        let then_col = compiled.branch_tracker.column("leaf-then").unwrap();
        let else_col = compiled.branch_tracker.column("leaf-else").unwrap();

        for t in 0..LEN {
            prop_assert!(then_col[t] == 0.0 || else_col[t] == 0.0);
            prop_assert_eq!(then_col[t] + else_col[t], 1.0);
        }
    }
}

// ── 3. Filter cardinality ────────────────────────────────────────────

proptest! {
    /// A top-N filter never puts weight on more than N candidates, and the
    /// selected weights always split equally.
    #[test]
    fn filter_selects_at_most_count(
        a in arb_closes(LEN),
        b in arb_closes(LEN),
        c in arb_closes(LEN),
        d in arb_closes(LEN),
        count in 1..4_usize,
        window in arb_window(),
    ) {
        let doc = format!(
            r#"{{
                "kind": "filter",
                "sort": {{"indicator": "relative-strength-index", "window": {window}}},
                "select": {{"direction": "top", "count": {count}}},
                "children": [
                    {{"kind": "asset", "ticker": "A"}},
                    {{"kind": "asset", "ticker": "B"}},
                    {{"kind": "asset", "ticker": "C"}},
                    {{"kind": "asset", "ticker": "D"}}
                ]
            }}"#
        );
        let tree = parse_str(&doc).unwrap();
        let prices = make_prices(vec![("A", a), ("B", b), ("C", c), ("D", d)]);
        let compiled = compile(&tree, &prices).unwrap();

        for t in 0..LEN {
            let weights: Vec<f64> = ["A", "B", "C", "D"]
                .iter()
                .map(|ticker| compiled.allocations.column(ticker).unwrap()[t])
                .collect();
            let selected = weights.iter().filter(|w| **w > 0.0).count();
            prop_assert!(selected <= count, "date {}: {} selected > {}", t, selected, count);
            if selected > 0 {
                let share = 1.0 / selected as f64;
                for w in weights.iter().filter(|w| **w > 0.0) {
                    prop_assert!((w - share).abs() < 1e-12);
                }
            }
        }
    }
}

// ── 4. Determinism ───────────────────────────────────────────────────

proptest! {
    /// Same document, same prices: both output matrices are identical.
    #[test]
    fn compile_is_deterministic(
        spy in arb_closes(LEN),
        a in arb_closes(LEN),
        b in arb_closes(LEN),
        window in arb_window(),
    ) {
        let doc = format!(
            r#"{{
                "kind": "condition",
                "predicate": {{
                    "type": "comparison",
                    "lhs": {{"ticker": "SPY", "indicator": "relative-strength-index", "window": {window}}},
                    "op": "lt",
                    "rhs": 50.0
                }},
                "then": {{
                    "kind": "filter",
                    "sort": {{"indicator": "moving-average-price", "window": {window}}},
                    "select": {{"direction": "bottom", "count": 1}},
                    "children": [
                        {{"kind": "asset", "ticker": "A"}},
                        {{"kind": "asset", "ticker": "B"}}
                    ]
                }},
                "else": {{"kind": "asset", "ticker": "SHY"}}
            }}"#
        );
        let tree = parse_str(&doc).unwrap();
        let prices = make_prices(vec![
            ("SPY", spy),
            ("A", a),
            ("B", b),
            ("SHY", vec![100.0; LEN]),
        ]);

        let first = compile(&tree, &prices).unwrap();
        let second = compile(&tree, &prices).unwrap();
        prop_assert_eq!(first.allocations, second.allocations);
        prop_assert_eq!(first.branch_tracker, second.branch_tracker);
        prop_assert_eq!(first.indicator_computes, second.indicator_computes);
    }
}
