//! Exponential moving average.
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], with
//! alpha = 2 / (window + 1). Seeded with the SMA of the first `window`
//! values, so the first valid output is at index `window - 1`.

/// EMA of `values` over `window`.
pub fn ema(values: &[f64], window: usize) -> Vec<f64> {
    debug_assert!(window >= 1);
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if n < window {
        return result;
    }

    let alpha = 2.0 / (window as f64 + 1.0);

    let mut sum = 0.0;
    for &v in values.iter().take(window) {
        if v.is_nan() {
            return result; // NaN in the seed window: nothing to smooth from
        }
        sum += v;
    }
    let mut current = sum / window as f64;
    result[window - 1] = current;

    for i in window..n {
        if values[i].is_nan() {
            // The recursion is broken; everything after stays NaN.
            return result;
        }
        current = alpha * values[i] + (1.0 - alpha) * current;
        result[i] = current;
    }

    result
}
