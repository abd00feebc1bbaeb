//! The branch-tracking compiler.
//!
//! A direct recursive interpreter over the strategy tree: each node is
//! evaluated vectorized across the entire date range, receiving the weight
//! and activation its parent routes to it and returning an allocation matrix
//! (ticker columns) plus a branch-tracker matrix (node-id columns).
//!
//! Conventions the whole module leans on:
//! - `weight[t]` is the fraction of the portfolio this subtree controls on
//!   date `t`; a leaf adds it straight into its ticker column.
//! - `active[t]` is a 0/1 mask: whether this subtree was chosen on date `t`.
//!   Every node id in the tree gets a tracker column, so non-chosen
//!   subtrees still contribute zero-valued columns.
//! - Sibling results are merged by outer-joining columns and adding; two
//!   leaves naming the same ticker sum into one allocation column.
//! - NaN comparisons are false, which routes conditionals to `else` on
//!   indicator warm-up days.

pub mod cache;

pub use cache::IndicatorCache;

use crate::domain::{NodeId, PriceTable, TimeMatrix};
use crate::indicators::IndicatorError;
use crate::tree::{
    collect_referenced_assets, representative_asset, Comparison, Operand, Predicate,
    SelectDirection, SortKey, StrategyNode, WeightRule,
};

/// Result of compiling one tree against one price table.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    /// date × ticker portfolio weights, untrimmed.
    pub allocations: TimeMatrix,
    /// date × node-id activation, untrimmed.
    pub branch_tracker: TimeMatrix,
    /// Indicator series actually computed (cache misses) — memoization
    /// instrumentation for tests and diagnostics.
    pub indicator_computes: usize,
}

/// Errors that abort the compile of one tree.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("referenced ticker '{ticker}' has no price history")]
    MissingPriceData { ticker: String },
    #[error("indicator failure at node '{node}': {source}")]
    Indicator {
        node: NodeId,
        #[source]
        source: IndicatorError,
    },
}

/// Compile `root` against `prices` with a fresh indicator cache.
pub fn compile(root: &StrategyNode, prices: &PriceTable) -> Result<Compiled, CompileError> {
    let mut cache = IndicatorCache::new();
    compile_with_cache(root, prices, &mut cache)
}

/// Compile with a caller-supplied cache (useful for instrumentation).
pub fn compile_with_cache(
    root: &StrategyNode,
    prices: &PriceTable,
    cache: &mut IndicatorCache,
) -> Result<Compiled, CompileError> {
    for ticker in collect_referenced_assets(root) {
        if !prices.has_history(&ticker) {
            return Err(CompileError::MissingPriceData { ticker });
        }
    }

    let n = prices.len();
    let full_weight = vec![1.0; n];
    let full_active = vec![1.0; n];
    let (allocations, branch_tracker) = eval_node(root, prices, cache, &full_weight, &full_active)?;

    Ok(Compiled {
        allocations,
        branch_tracker,
        indicator_computes: cache.computed(),
    })
}

// ─── Node evaluation ─────────────────────────────────────────────────

fn eval_node(
    node: &StrategyNode,
    prices: &PriceTable,
    cache: &mut IndicatorCache,
    weight: &[f64],
    active: &[f64],
) -> Result<(TimeMatrix, TimeMatrix), CompileError> {
    let dates = prices.dates().to_vec();
    match node {
        StrategyNode::AssetLeaf { id, ticker } => {
            // Weight lands on every date it is routed here, even dates with
            // missing price — consistency is the validator's job, not ours.
            let mut alloc = TimeMatrix::new(dates.clone());
            alloc.add_into(ticker, weight);
            let mut tracker = TimeMatrix::new(dates);
            tracker.add_into(id.as_str(), active);
            Ok((alloc, tracker))
        }

        StrategyNode::WeightedGroup { id, rule, children } => {
            let fractions = child_fractions(rule, children, prices, cache, id)?;
            let mut alloc = TimeMatrix::new(dates.clone());
            let mut tracker = TimeMatrix::new(dates);
            tracker.add_into(id.as_str(), active);

            for (child, frac) in children.iter().zip(&fractions) {
                let child_weight: Vec<f64> =
                    weight.iter().zip(frac).map(|(w, f)| w * f).collect();
                let child_active: Vec<f64> = active
                    .iter()
                    .zip(frac)
                    .map(|(a, f)| if *f > 0.0 { *a } else { 0.0 })
                    .collect();
                let (a, t) = eval_node(child, prices, cache, &child_weight, &child_active)?;
                alloc.merge(a);
                tracker.merge(t);
            }
            Ok((alloc, tracker))
        }

        StrategyNode::Conditional { id, predicate, then_branch, else_branch } => {
            let chosen = eval_predicate(predicate, prices, cache)
                .map_err(|source| CompileError::Indicator { node: id.clone(), source })?;

            let route = |take_then: bool| -> (Vec<f64>, Vec<f64>) {
                let w = weight
                    .iter()
                    .zip(&chosen)
                    .map(|(w, c)| if *c == take_then { *w } else { 0.0 })
                    .collect();
                let a = active
                    .iter()
                    .zip(&chosen)
                    .map(|(a, c)| if *c == take_then { *a } else { 0.0 })
                    .collect();
                (w, a)
            };

            let (then_weight, then_active) = route(true);
            let (else_weight, else_active) = route(false);

            let (mut alloc, mut tracker) =
                eval_node(then_branch, prices, cache, &then_weight, &then_active)?;
            let (else_alloc, else_tracker) =
                eval_node(else_branch, prices, cache, &else_weight, &else_active)?;
            alloc.merge(else_alloc);
            tracker.merge(else_tracker);
            tracker.add_into(id.as_str(), active);
            Ok((alloc, tracker))
        }

        StrategyNode::Filter { id, sort_key, direction, count, children } => {
            let fractions =
                filter_fractions(sort_key, *direction, *count, children, prices, cache, id)?;
            let mut alloc = TimeMatrix::new(dates.clone());
            let mut tracker = TimeMatrix::new(dates);
            tracker.add_into(id.as_str(), active);

            for (child, frac) in children.iter().zip(&fractions) {
                let child_weight: Vec<f64> =
                    weight.iter().zip(frac).map(|(w, f)| w * f).collect();
                let child_active: Vec<f64> = active
                    .iter()
                    .zip(frac)
                    .map(|(a, f)| if *f > 0.0 { *a } else { 0.0 })
                    .collect();
                let (a, t) = eval_node(child, prices, cache, &child_weight, &child_active)?;
                alloc.merge(a);
                tracker.merge(t);
            }
            Ok((alloc, tracker))
        }
    }
}

// ─── Predicates ──────────────────────────────────────────────────────

/// Evaluate a predicate to one boolean per date. NaN on either side of a
/// comparison yields false.
fn eval_predicate(
    predicate: &Predicate,
    prices: &PriceTable,
    cache: &mut IndicatorCache,
) -> Result<Vec<bool>, IndicatorError> {
    match predicate {
        Predicate::Comparison(c) => eval_comparison(c, prices, cache),
        Predicate::AllOf(parts) => {
            let mut combined = vec![true; prices.len()];
            for part in parts {
                let values = eval_predicate(part, prices, cache)?;
                for (slot, v) in combined.iter_mut().zip(values) {
                    *slot = *slot && v;
                }
            }
            Ok(combined)
        }
        Predicate::AnyOf(parts) => {
            let mut combined = vec![false; prices.len()];
            for part in parts {
                let values = eval_predicate(part, prices, cache)?;
                for (slot, v) in combined.iter_mut().zip(values) {
                    *slot = *slot || v;
                }
            }
            Ok(combined)
        }
    }
}

fn eval_comparison(
    c: &Comparison,
    prices: &PriceTable,
    cache: &mut IndicatorCache,
) -> Result<Vec<bool>, IndicatorError> {
    let lhs = cache.series(prices, &c.lhs.ticker, c.lhs.kind, c.lhs.window)?;
    match &c.rhs {
        Operand::Literal(threshold) => Ok(lhs
            .iter()
            .map(|&l| !l.is_nan() && c.op.apply(l, *threshold))
            .collect()),
        Operand::Expr(expr) => {
            let rhs = cache.series(prices, &expr.ticker, expr.kind, expr.window)?;
            Ok(lhs
                .iter()
                .zip(rhs.iter())
                .map(|(&l, &r)| !l.is_nan() && !r.is_nan() && c.op.apply(l, r))
                .collect())
        }
    }
}

// ─── Weighting rules ─────────────────────────────────────────────────

/// Per-child weight fractions for a `WeightedGroup`, one series per child.
fn child_fractions(
    rule: &WeightRule,
    children: &[StrategyNode],
    prices: &PriceTable,
    cache: &mut IndicatorCache,
    group_id: &NodeId,
) -> Result<Vec<Vec<f64>>, CompileError> {
    let n = prices.len();
    let k = children.len();
    match rule {
        WeightRule::Equal => Ok(vec![vec![1.0 / k as f64; n]; k]),
        WeightRule::Explicit { weights } => {
            Ok(weights.iter().map(|&w| vec![w; n]).collect())
        }
        WeightRule::InverseVolatility { window } => {
            // 1/σ of each child's representative asset; children without a
            // computable σ on a date get zero and the rest renormalize.
            let mut inverse = vec![vec![0.0; n]; k];
            for (child, inv) in children.iter().zip(&mut inverse) {
                let Some(ticker) = representative_asset(child) else {
                    continue;
                };
                let sigma = cache
                    .series(
                        prices,
                        ticker,
                        crate::indicators::IndicatorKind::StandardDeviationReturn,
                        *window,
                    )
                    .map_err(|source| CompileError::Indicator {
                        node: group_id.clone(),
                        source,
                    })?;
                for (slot, &s) in inv.iter_mut().zip(sigma.iter()) {
                    if s.is_finite() && s > 0.0 {
                        *slot = 1.0 / s;
                    }
                }
            }

            for t in 0..n {
                let total: f64 = inverse.iter().map(|inv| inv[t]).sum();
                if total > 0.0 {
                    for inv in &mut inverse {
                        inv[t] /= total;
                    }
                }
                // total == 0: every fraction stays 0 — zero propagation.
            }
            Ok(inverse)
        }
    }
}

/// Per-candidate fractions for a `Filter`: equal split of the full incoming
/// weight among the up-to-`count` selected candidates each date.
fn filter_fractions(
    sort_key: &SortKey,
    direction: SelectDirection,
    count: usize,
    children: &[StrategyNode],
    prices: &PriceTable,
    cache: &mut IndicatorCache,
    filter_id: &NodeId,
) -> Result<Vec<Vec<f64>>, CompileError> {
    let n = prices.len();
    let k = children.len();

    let mut keys = Vec::with_capacity(k);
    for child in children {
        match representative_asset(child) {
            Some(ticker) => {
                let series = cache
                    .series(prices, ticker, sort_key.kind, sort_key.window)
                    .map_err(|source| CompileError::Indicator {
                        node: filter_id.clone(),
                        source,
                    })?;
                keys.push(Some(series));
            }
            None => keys.push(None),
        }
    }

    let mut fractions = vec![vec![0.0; n]; k];
    for t in 0..n {
        // Candidates with a valid (finite) sort key this date; NaN keys are
        // excluded even when `count` would otherwise reach them.
        let mut ranked: Vec<(usize, f64)> = keys
            .iter()
            .enumerate()
            .filter_map(|(i, key)| {
                key.as_ref()
                    .map(|s| s[t])
                    .filter(|v| v.is_finite())
                    .map(|v| (i, v))
            })
            .collect();

        match direction {
            SelectDirection::Top => ranked.sort_by(|a, b| b.1.total_cmp(&a.1)),
            SelectDirection::Bottom => ranked.sort_by(|a, b| a.1.total_cmp(&b.1)),
        }

        let selected = ranked.len().min(count);
        if selected == 0 {
            continue; // zero propagation: no valid candidate this date
        }
        let share = 1.0 / selected as f64;
        for &(child_index, _) in ranked.iter().take(selected) {
            fractions[child_index][t] = share;
        }
    }
    Ok(fractions)
}
