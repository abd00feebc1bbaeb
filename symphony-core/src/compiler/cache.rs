//! Per-compile indicator memoization.
//!
//! The same indicator expression is typically referenced by many nodes of
//! one tree; each `(ticker, kind, window)` is computed once per compile and
//! shared. The cache is an explicit object owned by a single `compile` call
//! — never a singleton, never shared across trees.

use crate::domain::PriceTable;
use crate::indicators::{self, IndicatorError, IndicatorKind};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    ticker: String,
    kind: IndicatorKind,
    window: usize,
}

#[derive(Debug, Default)]
pub struct IndicatorCache {
    entries: HashMap<CacheKey, Rc<Vec<f64>>>,
    computed: usize,
}

impl IndicatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The indicator series for `(ticker, kind, window)`, computing it on
    /// first use and returning the memoized copy afterwards.
    pub fn series(
        &mut self,
        prices: &PriceTable,
        ticker: &str,
        kind: IndicatorKind,
        window: usize,
    ) -> Result<Rc<Vec<f64>>, IndicatorError> {
        let key = CacheKey { ticker: ticker.to_string(), kind, window };
        if let Some(hit) = self.entries.get(&key) {
            return Ok(Rc::clone(hit));
        }

        let closes = prices
            .closes(ticker)
            .ok_or_else(|| IndicatorError::MissingSeries { ticker: ticker.to_string() })?;
        let values = Rc::new(indicators::compute(closes, kind, window)?);
        self.computed += 1;
        self.entries.insert(key, Rc::clone(&values));
        Ok(values)
    }

    /// How many series were actually computed (cache misses).
    pub fn computed(&self) -> usize {
        self.computed
    }
}
