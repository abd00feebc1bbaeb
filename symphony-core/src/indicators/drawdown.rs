//! Trailing maximum drawdown.
//!
//! For each position: the worst peak-to-trough decline (as a positive
//! percentage) seen within the trailing window. The running peak uses
//! min_periods = 1 so the window start seeds an expanding maximum, matching
//! the original research code:
//!
//! ```text
//! peaks     = close.rolling(window, min_periods=1).max()
//! drawdowns = close / peaks - 1
//! result    = drawdowns.rolling(window, min_periods=1).min() * -100
//! ```

/// Trailing max drawdown of `values` over `window`, in positive percent.
pub fn max_drawdown(values: &[f64], window: usize) -> Vec<f64> {
    debug_assert!(window >= 1);
    let n = values.len();

    let mut drawdowns = vec![f64::NAN; n];
    for i in 0..n {
        let start = i.saturating_sub(window - 1);
        let peak = values[start..=i].iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if peak > 0.0 {
            drawdowns[i] = values[i] / peak - 1.0;
        }
    }

    let mut result = vec![f64::NAN; n];
    for i in 0..n {
        let start = i.saturating_sub(window - 1);
        let worst = drawdowns[start..=i].iter().copied().fold(f64::INFINITY, f64::min);
        if worst.is_finite() {
            result[i] = worst * -100.0;
        }
    }
    result
}
