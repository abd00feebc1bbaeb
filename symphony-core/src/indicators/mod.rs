//! Vectorized technical indicators over one asset's close series.
//!
//! `compute` is the single engine entry point: it dispatches on
//! `IndicatorKind`, runs the kernel over the whole series at once, and keeps
//! pandas-compatible semantics from the original research code:
//!
//! - kernels see the *compacted* series (NaN rows dropped), and results are
//!   scattered back onto the full date axis with NaN elsewhere;
//! - rolling windows require a full window of data (NaN until then);
//! - return-based kinds are expressed in percent (×100) so comparisons
//!   against whole-number thresholds are exact;
//! - `current-price` is the identity over the raw, NaN-preserving series.
//!
//! Unrecognized kind/window combinations fail fast with
//! `IndicatorError::UnsupportedIndicator` — never a silent zero series.

pub mod drawdown;
pub mod ema;
pub mod returns;
pub mod rsi;
pub mod sma;
pub mod stdev;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The supported indicator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndicatorKind {
    CurrentPrice,
    CumulativeReturn,
    MovingAveragePrice,
    ExponentialMovingAveragePrice,
    StandardDeviationPrice,
    RelativeStrengthIndex,
    StandardDeviationReturn,
    MovingAverageReturn,
    MaxDrawdown,
}

impl IndicatorKind {
    pub fn name(&self) -> &'static str {
        match self {
            IndicatorKind::CurrentPrice => "current-price",
            IndicatorKind::CumulativeReturn => "cumulative-return",
            IndicatorKind::MovingAveragePrice => "moving-average-price",
            IndicatorKind::ExponentialMovingAveragePrice => "exponential-moving-average-price",
            IndicatorKind::StandardDeviationPrice => "standard-deviation-price",
            IndicatorKind::RelativeStrengthIndex => "relative-strength-index",
            IndicatorKind::StandardDeviationReturn => "standard-deviation-return",
            IndicatorKind::MovingAverageReturn => "moving-average-return",
            IndicatorKind::MaxDrawdown => "max-drawdown",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "current-price" => IndicatorKind::CurrentPrice,
            "cumulative-return" => IndicatorKind::CumulativeReturn,
            "moving-average-price" => IndicatorKind::MovingAveragePrice,
            "exponential-moving-average-price" => IndicatorKind::ExponentialMovingAveragePrice,
            "standard-deviation-price" => IndicatorKind::StandardDeviationPrice,
            "relative-strength-index" => IndicatorKind::RelativeStrengthIndex,
            "standard-deviation-return" => IndicatorKind::StandardDeviationReturn,
            "moving-average-return" => IndicatorKind::MovingAverageReturn,
            "max-drawdown" => IndicatorKind::MaxDrawdown,
            _ => return None,
        })
    }

    /// Whether the window length is meaningful for this kind.
    pub fn is_windowed(&self) -> bool {
        !matches!(self, IndicatorKind::CurrentPrice)
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Errors from the indicator engine.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IndicatorError {
    #[error("unsupported indicator: {kind} with window {window}")]
    UnsupportedIndicator { kind: IndicatorKind, window: usize },
    #[error("no price series for ticker '{ticker}'")]
    MissingSeries { ticker: String },
}

/// Compute one indicator over a full, possibly gappy, close series.
///
/// The output is aligned with the input: index i of the result belongs to
/// the same date as `closes[i]`.
pub fn compute(
    closes: &[f64],
    kind: IndicatorKind,
    window: usize,
) -> Result<Vec<f64>, IndicatorError> {
    if !kind.is_windowed() {
        return Ok(closes.to_vec());
    }
    if window == 0 {
        return Err(IndicatorError::UnsupportedIndicator { kind, window });
    }

    let (index, dense) = compact(closes);
    let result = match kind {
        IndicatorKind::CurrentPrice => unreachable!("handled above"),
        IndicatorKind::CumulativeReturn => {
            scale(returns::pct_change(&dense, window), 100.0)
        }
        IndicatorKind::MovingAveragePrice => sma::rolling_mean(&dense, window),
        IndicatorKind::ExponentialMovingAveragePrice => ema::ema(&dense, window),
        IndicatorKind::StandardDeviationPrice => stdev::rolling_std(&dense, window),
        IndicatorKind::RelativeStrengthIndex => rsi::rsi(&dense, window),
        IndicatorKind::StandardDeviationReturn => {
            stdev::rolling_std(&returns::daily_returns_pct(&dense), window)
        }
        IndicatorKind::MovingAverageReturn => {
            sma::rolling_mean(&returns::daily_returns_pct(&dense), window)
        }
        IndicatorKind::MaxDrawdown => drawdown::max_drawdown(&dense, window),
    };

    Ok(scatter(closes.len(), &index, &result))
}

/// Drop NaN rows, remembering where each surviving value came from.
fn compact(closes: &[f64]) -> (Vec<usize>, Vec<f64>) {
    let mut index = Vec::with_capacity(closes.len());
    let mut dense = Vec::with_capacity(closes.len());
    for (i, &v) in closes.iter().enumerate() {
        if !v.is_nan() {
            index.push(i);
            dense.push(v);
        }
    }
    (index, dense)
}

/// Scatter a dense result back onto the full axis, NaN elsewhere.
fn scatter(len: usize, index: &[usize], dense: &[f64]) -> Vec<f64> {
    let mut full = vec![f64::NAN; len];
    for (&i, &v) in index.iter().zip(dense) {
        full[i] = v;
    }
    full
}

fn scale(mut values: Vec<f64>, factor: f64) -> Vec<f64> {
    for v in &mut values {
        *v *= factor;
    }
    values
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in [
            IndicatorKind::CurrentPrice,
            IndicatorKind::CumulativeReturn,
            IndicatorKind::MovingAveragePrice,
            IndicatorKind::ExponentialMovingAveragePrice,
            IndicatorKind::StandardDeviationPrice,
            IndicatorKind::RelativeStrengthIndex,
            IndicatorKind::StandardDeviationReturn,
            IndicatorKind::MovingAverageReturn,
            IndicatorKind::MaxDrawdown,
        ] {
            assert_eq!(IndicatorKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(IndicatorKind::from_name("bollinger-bandwidth"), None);
    }

    #[test]
    fn zero_window_is_rejected_for_windowed_kinds() {
        let closes = [100.0, 101.0, 102.0];
        let err = compute(&closes, IndicatorKind::MovingAveragePrice, 0).unwrap_err();
        assert!(matches!(err, IndicatorError::UnsupportedIndicator { window: 0, .. }));
    }

    #[test]
    fn current_price_ignores_window_and_keeps_nans() {
        let closes = [100.0, f64::NAN, 102.0];
        let result = compute(&closes, IndicatorKind::CurrentPrice, 0).unwrap();
        assert_eq!(result[0], 100.0);
        assert!(result[1].is_nan());
        assert_eq!(result[2], 102.0);
    }

    #[test]
    fn gaps_are_compacted_before_windowing() {
        // 20-day returns on a series with a hole: the window spans *priced*
        // days, exactly like pandas' close.dropna().pct_change(n).
        let mut closes = vec![100.0; 6];
        closes[2] = f64::NAN;
        closes[5] = 110.0;
        // Compacted series: [100, 100, 100, 100, 110] — pct_change(4) hits
        // the last entry only.
        let result = compute(&closes, IndicatorKind::CumulativeReturn, 4).unwrap();
        assert!(result[2].is_nan()); // hole stays a hole
        assert!(result[4].is_nan()); // only 3 prior priced days
        assert_approx(result[5], 10.0, DEFAULT_EPSILON);
    }

    #[test]
    fn cumulative_return_is_percent() {
        let closes = [100.0, 101.0, 102.0, 105.0];
        let result = compute(&closes, IndicatorKind::CumulativeReturn, 3).unwrap();
        assert!(result[2].is_nan());
        assert_approx(result[3], 5.0, DEFAULT_EPSILON);
    }

    #[test]
    fn moving_average_return_needs_window_of_returns() {
        let closes = [100.0, 110.0, 121.0, 133.1];
        // daily returns (pct): [NaN, 10, 10, 10]
        let result = compute(&closes, IndicatorKind::MovingAverageReturn, 2).unwrap();
        assert!(result[0].is_nan());
        assert!(result[1].is_nan()); // window still contains the leading NaN
        assert_approx(result[2], 10.0, 1e-9);
        assert_approx(result[3], 10.0, 1e-9);
    }
}
