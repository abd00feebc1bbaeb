//! Rolling standard deviation.
//!
//! Sample standard deviation (ddof = 1, the pandas default), full-window
//! semantics: NaN until `window - 1`, NaN wherever the window contains NaN.
//! A window of 1 has zero degrees of freedom and is NaN everywhere.

/// Rolling sample standard deviation of `values` over `window`.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    debug_assert!(window >= 1);
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window < 2 || n < window {
        return result;
    }

    for i in (window - 1)..n {
        let slice = &values[(i + 1 - window)..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mean = slice.iter().sum::<f64>() / window as f64;
        let var = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window as f64 - 1.0);
        result[i] = var.sqrt();
    }

    result
}
