//! NaN-propagating column transforms.
//!
//! Each function maps an input column to an output column of the same length.
//! Outputs are NaN wherever the window is incomplete or touches a NaN, and no
//! output at index i reads input beyond index i (except `shift` with a negative
//! lag, which the feature builder never uses on features).

/// `x[i] / x[i - periods] - 1`. Non-finite ratios (division by zero) are NaN.
pub fn pct_change(values: &[f64], periods: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in periods..values.len() {
        let r = values[i] / values[i - periods] - 1.0;
        if r.is_finite() {
            out[i] = r;
        }
    }
    out
}

/// Rolling arithmetic mean over `window` values. First valid index: `window - 1`.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    assert!(window >= 1, "rolling window must be >= 1");
    let mut out = vec![f64::NAN; values.len()];
    if values.len() < window {
        return out;
    }
    for i in (window - 1)..values.len() {
        let slice = &values[(i + 1 - window)..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        out[i] = slice.iter().sum::<f64>() / window as f64;
    }
    out
}

/// Rolling sample standard deviation (ddof = 1) over `window` values.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    assert!(window >= 2, "rolling std window must be >= 2");
    let mut out = vec![f64::NAN; values.len()];
    if values.len() < window {
        return out;
    }
    for i in (window - 1)..values.len() {
        let slice = &values[(i + 1 - window)..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mean = slice.iter().sum::<f64>() / window as f64;
        let var = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
        out[i] = var.sqrt();
    }
    out
}

/// Move values `lag` positions later: `out[i] = x[i - lag]`; the first `lag` are NaN.
pub fn shift(values: &[f64], lag: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in lag..values.len() {
        out[i] = values[i - lag];
    }
    out
}
