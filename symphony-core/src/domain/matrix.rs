//! Date-indexed f64 matrix with named columns.
//!
//! Both compiler outputs (allocations keyed by ticker, branch tracker keyed
//! by node id) are `TimeMatrix` values. Sibling subtrees are compiled
//! independently and may emit the same column, so merging outer-joins on
//! column name and adds values; absent entries count as 0.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq)]
pub struct TimeMatrix {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl TimeMatrix {
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        Self { dates, columns: BTreeMap::new() }
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

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|s| s.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(|c| c.as_slice())
    }

    /// Add `values` into the named column, creating it zero-filled if absent.
    pub fn add_into(&mut self, name: &str, values: &[f64]) {
        assert_eq!(values.len(), self.dates.len(), "column length mismatch");
        let column = self
            .columns
            .entry(name.to_string())
            .or_insert_with(|| vec![0.0; self.dates.len()]);
        for (slot, v) in column.iter_mut().zip(values) {
            *slot += v;
        }
    }

    /// Merge another matrix on the same date axis, adding shared columns.
    pub fn merge(&mut self, other: TimeMatrix) {
        assert_eq!(self.dates, other.dates, "merging matrices on different date axes");
        for (name, values) in other.columns {
            self.add_into(&name, &values);
        }
    }

    /// Drop every column whose name is not in `keep`.
    pub fn retain_columns(&mut self, keep: &BTreeSet<String>) {
        self.columns.retain(|name, _| keep.contains(name));
    }

    /// Sum of the row at `index` across all columns.
    pub fn row_sum(&self, index: usize) -> f64 {
        self.columns.values().map(|c| c[index]).sum()
    }

    /// Whether the row at `index` contains any NaN.
    pub fn row_has_nan(&self, index: usize) -> bool {
        self.columns.values().any(|c| c[index].is_nan())
    }

    /// Keep only rows from `start` (inclusive) onward.
    pub fn trim_before(&mut self, start: usize) {
        self.dates.drain(..start);
        for column in self.columns.values_mut() {
            column.drain(..start);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        (0..n).map(|i| base + chrono::Duration::days(i as i64)).collect()
    }

    #[test]
    fn add_into_creates_and_accumulates() {
        let mut m = TimeMatrix::new(dates(3));
        m.add_into("SPY", &[0.5, 0.5, 0.0]);
        m.add_into("SPY", &[0.5, 0.0, 0.0]);
        assert_eq!(m.column("SPY").unwrap(), &[1.0, 0.5, 0.0]);
    }

    #[test]
    fn merge_outer_joins_columns() {
        let mut left = TimeMatrix::new(dates(2));
        left.add_into("QQQ", &[1.0, 0.0]);

        let mut right = TimeMatrix::new(dates(2));
        right.add_into("QQQ", &[0.0, 0.5]);
        right.add_into("SHY", &[0.0, 0.5]);

        left.merge(right);
        assert_eq!(left.column("QQQ").unwrap(), &[1.0, 0.5]);
        assert_eq!(left.column("SHY").unwrap(), &[0.0, 0.5]);
    }

    #[test]
    fn trim_before_drops_leading_rows() {
        let mut m = TimeMatrix::new(dates(4));
        m.add_into("SPY", &[0.0, 0.0, 1.0, 1.0]);
        m.trim_before(2);
        assert_eq!(m.len(), 2);
        assert_eq!(m.column("SPY").unwrap(), &[1.0, 1.0]);
    }

    #[test]
    fn row_sum_and_nan_detection() {
        let mut m = TimeMatrix::new(dates(2));
        m.add_into("A", &[0.25, f64::NAN]);
        m.add_into("B", &[0.75, 1.0]);
        assert!((m.row_sum(0) - 1.0).abs() < 1e-12);
        assert!(!m.row_has_nan(0));
        assert!(m.row_has_nan(1));
    }
}
