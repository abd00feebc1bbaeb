//! Relative Strength Index (RSI).
//!
//! Uses Wilder smoothing of average gains and average losses.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! First valid value at index `window` (needs `window` price changes).
//! Edge cases: avg_loss == 0 → RSI = 100; avg_gain == 0 → RSI = 0.

/// Wilder RSI of `values` over `window`.
pub fn rsi(values: &[f64], window: usize) -> Vec<f64> {
    debug_assert!(window >= 1);
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if n < window + 1 {
        return result;
    }

    // Seed: average gain and loss over the first `window` changes.
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=window {
        let change = values[i] - values[i - 1];
        if change.is_nan() {
            return result;
        }
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= window as f64;
    avg_loss /= window as f64;

    result[window] = rsi_value(avg_gain, avg_loss);

    // Wilder smoothing for subsequent values.
    let alpha = 1.0 / window as f64;
    for i in (window + 1)..n {
        let change = values[i] - values[i - 1];
        if change.is_nan() {
            return result;
        }

        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };

        avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;

        result[i] = rsi_value(avg_gain, avg_loss);
    }

    result
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // no movement
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
