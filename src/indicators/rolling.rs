// =============================================================================
// Rolling-window helpers
// =============================================================================
//
// Every helper takes an aligned `Option<f64>` series and requires a full
// window: output `i` is defined only when all `window` inputs ending at `i`
// are defined. This lets undefined leading values (e.g. the first RSI bar)
// propagate through chained windows without special cases.

/// Apply `reduce` over every complete window of `values`.
fn rolling<F>(values: &[Option<f64>], window: usize, reduce: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    let mut out = vec![None; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }

    let mut buf: Vec<f64> = Vec::with_capacity(window);
    for end in window - 1..values.len() {
        buf.clear();
        buf.extend(values[end + 1 - window..=end].iter().map_while(|v| *v));
        if buf.len() == window {
            let r = reduce(&buf);
            if r.is_finite() {
                out[end] = Some(r);
            }
        }
    }
    out
}

/// Lowest value of each complete window.
pub fn rolling_min(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |w| w.iter().copied().fold(f64::INFINITY, f64::min))
}

/// Highest value of each complete window.
pub fn rolling_max(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |w| w.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

/// Arithmetic mean of each complete window.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |w| w.iter().sum::<f64>() / w.len() as f64)
}

/// Lift a plain series into the aligned form.
pub fn defined(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().map(|v| v.is_finite().then_some(*v)).collect()
}
