//! Price CSV loading.
//!
//! The expected layout is one wide CSV: a `date` column (YYYY-MM-DD,
//! ascending) followed by one close-price column per ticker. Empty cells
//! mark dates before a ticker started trading (or gaps) and load as NaN.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::Path;
use symphony_core::PriceTable;
use thiserror::Error;

/// Errors from the price loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("'{path}' has no header row")]
    MissingHeader { path: String },
    #[error("'{path}' first column must be 'date', found '{found}'")]
    BadDateColumn { path: String, found: String },
    #[error("'{path}' row {row}: bad date '{value}'")]
    BadDate { path: String, row: usize, value: String },
    #[error("'{path}' row {row}: bad close '{value}' for {ticker}")]
    BadClose { path: String, row: usize, ticker: String, value: String },
    #[error("'{path}' row {row}: date {value} is not after the previous row")]
    OutOfOrder { path: String, row: usize, value: NaiveDate },
    #[error("'{path}' contains no data rows")]
    Empty { path: String },
}

/// Load a wide close-price CSV into a `PriceTable`.
pub fn load_price_csv(path: &Path) -> Result<PriceTable, LoadError> {
    let display = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|source| LoadError::Csv { path: display.clone(), source })?;

    let headers = reader
        .headers()
        .map_err(|source| LoadError::Csv { path: display.clone(), source })?
        .clone();
    let mut columns = headers.iter();
    match columns.next() {
        Some(first) if first.eq_ignore_ascii_case("date") => {}
        Some(first) => {
            return Err(LoadError::BadDateColumn {
                path: display,
                found: first.to_string(),
            })
        }
        None => return Err(LoadError::MissingHeader { path: display }),
    }
    let tickers: Vec<String> = columns.map(str::to_string).collect();

    let mut dates: Vec<NaiveDate> = Vec::new();
    let mut closes: BTreeMap<String, Vec<f64>> =
        tickers.iter().map(|t| (t.clone(), Vec::new())).collect();

    for (index, record) in reader.records().enumerate() {
        let row = index + 2; // 1-based, after the header
        let record =
            record.map_err(|source| LoadError::Csv { path: display.clone(), source })?;
        let raw_date = record.get(0).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|_| {
            LoadError::BadDate { path: display.clone(), row, value: raw_date.to_string() }
        })?;
        if let Some(last) = dates.last() {
            if date <= *last {
                return Err(LoadError::OutOfOrder { path: display, row, value: date });
            }
        }
        dates.push(date);

        for (k, ticker) in tickers.iter().enumerate() {
            let cell = record.get(k + 1).unwrap_or_default().trim();
            let close = if cell.is_empty() {
                f64::NAN
            } else {
                cell.parse::<f64>().map_err(|_| LoadError::BadClose {
                    path: display.clone(),
                    row,
                    ticker: ticker.clone(),
                    value: cell.to_string(),
                })?
            };
            if let Some(column) = closes.get_mut(ticker) {
                column.push(close);
            }
        }
    }

    if dates.is_empty() {
        return Err(LoadError::Empty { path: display });
    }
    Ok(PriceTable::from_columns(dates, closes))
}
