//! Return series derived from close prices.

/// Fractional change over `lag` positions: `x[t] / x[t-lag] - 1`.
///
/// NaN for the first `lag` positions.
pub fn pct_change(values: &[f64], lag: usize) -> Vec<f64> {
    debug_assert!(lag >= 1);
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    for i in lag..n {
        let prev = values[i - lag];
        if prev != 0.0 {
            result[i] = values[i] / prev - 1.0;
        }
    }
    result
}

/// Day-over-day percentage return (×100), NaN at index 0.
pub fn daily_returns_pct(values: &[f64]) -> Vec<f64> {
    let mut result = pct_change(values, 1);
    for v in &mut result {
        *v *= 100.0;
    }
    result
}
