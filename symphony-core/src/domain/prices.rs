//! Aligned close-price history for multiple tickers.
//!
//! The price table is the compiler's only market-data input: one shared date
//! axis, one close column per ticker. Missing observations are strict NaN —
//! the core never interpolates or forward-fills price data.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Date × ticker table of close prices on an outer-joined date axis.
#[derive(Debug, Clone)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    closes: BTreeMap<String, Vec<f64>>,
}

impl PriceTable {
    /// Build a table from per-ticker (date, close) series.
    ///
    /// The date axis is the sorted union of all series' dates; tickers
    /// missing a date get NaN there.
    pub fn from_series(series: BTreeMap<String, Vec<(NaiveDate, f64)>>) -> Self {
        let mut all_dates = BTreeSet::new();
        for points in series.values() {
            for (date, _) in points {
                all_dates.insert(*date);
            }
        }
        let dates: Vec<NaiveDate> = all_dates.into_iter().collect();

        let mut closes = BTreeMap::new();
        for (ticker, points) in series {
            let by_date: BTreeMap<NaiveDate, f64> = points.into_iter().collect();
            let column: Vec<f64> = dates
                .iter()
                .map(|d| by_date.get(d).copied().unwrap_or(f64::NAN))
                .collect();
            closes.insert(ticker, column);
        }

        Self { dates, closes }
    }

    /// Build a table directly from pre-aligned columns.
    ///
    /// Every column must have the same length as `dates`.
    pub fn from_columns(dates: Vec<NaiveDate>, closes: BTreeMap<String, Vec<f64>>) -> Self {
        for (ticker, column) in &closes {
            assert_eq!(
                column.len(),
                dates.len(),
                "close column '{ticker}' does not match the date axis"
            );
        }
        Self { dates, closes }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.closes.keys().map(|s| s.as_str())
    }

    pub fn closes(&self, ticker: &str) -> Option<&[f64]> {
        self.closes.get(ticker).map(|c| c.as_slice())
    }

    /// Whether the ticker has at least one non-NaN close.
    pub fn has_history(&self, ticker: &str) -> bool {
        self.closes(ticker)
            .is_some_and(|column| column.iter().any(|v| !v.is_nan()))
    }
}
