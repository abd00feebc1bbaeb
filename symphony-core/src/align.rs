//! Alignment & validation of compiled matrices.
//!
//! Trims both outputs to the earliest date the full strategy could legally
//! have been traded, then audits every remaining allocation row: any date
//! whose weights do not sum to 1 is attributed to the leaf branch ids active
//! that day. In a correct compilation the failure list is empty; a non-empty
//! list signals a modeling bug, not a data problem, so it is reported as
//! data rather than raised as an error.

use crate::compiler::Compiled;
use crate::domain::{NodeId, PriceTable, TimeMatrix};
use crate::tree::{collect_allocatable_assets, collect_leaf_ids, StrategyNode};
use chrono::NaiveDate;

/// Maximum tolerated deviation of a daily allocation row from 1.
pub const ALLOCATION_TOLERANCE: f64 = 0.0001;

/// One day whose allocation row failed to sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedAllocation {
    pub date: NaiveDate,
    /// What the row actually summed to.
    pub sum: f64,
    /// Leaf branch ids with nonzero activation that day — the suspects.
    pub branch_ids: Vec<NodeId>,
}

/// Trimmed matrices plus the validation findings.
#[derive(Debug, Clone)]
pub struct Aligned {
    pub allocations: TimeMatrix,
    pub branch_tracker: TimeMatrix,
    /// First date of the trimmed matrices.
    pub start_date: NaiveDate,
    pub failures: Vec<FailedAllocation>,
}

impl Aligned {
    /// Distinct leaf branch ids implicated in any failed day.
    pub fn suspect_branches(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .failures
            .iter()
            .flat_map(|f| f.branch_ids.iter().cloned())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AlignError {
    #[error("no date has prices for every allocatable ticker")]
    NoTradableWindow,
    #[error("allocations never resolve to a tradable row")]
    NeverResolves,
}

/// Trim to the first fully-supported date and flag inconsistent rows.
pub fn align_and_check(
    compiled: Compiled,
    prices: &PriceTable,
    root: &StrategyNode,
) -> Result<Aligned, AlignError> {
    let Compiled { mut allocations, mut branch_tracker, .. } = compiled;

    // Tickers referenced only inside indicator expressions exist to feed
    // conditions and sorts; they are not holdings.
    let allocatable = collect_allocatable_assets(root);
    allocations.retain_columns(&allocatable);

    // Earliest date on which every allocatable ticker has a real price —
    // before this the full strategy could not have been traded.
    let tradable_from = (0..prices.len())
        .find(|&t| {
            allocatable
                .iter()
                .all(|ticker| prices.closes(ticker).is_some_and(|c| !c[t].is_nan()))
        })
        .ok_or(AlignError::NoTradableWindow)?;
    allocations.trim_before(tradable_from);
    branch_tracker.trim_before(tradable_from);

    // Second pass: the root may still not resolve for a while (long
    // indicator warm-ups produce leading all-zero rows). Trim to the first
    // row that actually allocates.
    let resolved_from = (0..allocations.len())
        .find(|&t| !allocations.row_has_nan(t) && allocations.row_sum(t) > 0.0)
        .ok_or(AlignError::NeverResolves)?;
    allocations.trim_before(resolved_from);
    branch_tracker.trim_before(resolved_from);

    let start_date = allocations.dates()[0];
    let failures = check_allocations(&allocations, &branch_tracker, root);

    Ok(Aligned { allocations, branch_tracker, start_date, failures })
}

/// Flag every date whose allocation row is off by more than the tolerance,
/// attributing it to the leaf branches active that day.
fn check_allocations(
    allocations: &TimeMatrix,
    branch_tracker: &TimeMatrix,
    root: &StrategyNode,
) -> Vec<FailedAllocation> {
    let leaf_ids = collect_leaf_ids(root);
    let mut failures = Vec::new();

    for t in 0..allocations.len() {
        let sum = allocations.row_sum(t);
        if (sum - 1.0).abs() <= ALLOCATION_TOLERANCE {
            continue;
        }
        let branch_ids: Vec<NodeId> = leaf_ids
            .iter()
            .filter(|id| {
                branch_tracker
                    .column(id.as_str())
                    .is_some_and(|c| c[t] != 0.0)
            })
            .cloned()
            .collect();
        failures.push(FailedAllocation {
            date: allocations.dates()[t],
            sum,
            branch_ids,
        });
    }
    failures
}
