// =============================================================================
// Relative Strength Index (RSI)
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1 — Compute price changes (deltas) from consecutive closes.
// Step 2 — Average the gains and the losses, either
//            simple: arithmetic mean of the last `period` gains / losses, or
//            Wilder: seed with the SMA of the first `period` gains / losses,
//                    then avg = (prev_avg * (period - 1) + current) / period
// Step 3 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// Thresholds:  RSI >= 70 => OVERBOUGHT,  RSI <= 30 => OVERSOLD.
// =============================================================================

use crate::types::RsiMethod;

/// Smallest RSI period accepted from users.
pub const MIN_PERIOD: usize = 2;
/// Largest RSI period accepted from users.
pub const MAX_PERIOD: usize = 100;

/// RSI aligned to `closes`: element `i` is the RSI at close `i`, or `None`
/// where it is undefined.
pub fn rsi_series(closes: &[f64], period: usize, method: RsiMethod) -> Vec<Option<f64>> {
    match method {
        RsiMethod::Simple => rolling_rsi(closes, period),
        RsiMethod::Wilder => {
            // The compact Wilder series starts at close index `period`.
            let compact = calculate_rsi(closes, period);
            let mut aligned = vec![None; closes.len()];
            for (offset, value) in compact.into_iter().enumerate() {
                aligned[period + offset] = Some(value);
            }
            aligned
        }
    }
}

/// Simple-average RSI aligned to `closes`.
///
/// Gains and losses are averaged over the last `period` bars, or over all
/// bars seen so far while fewer than `period` are available. The first close
/// has no delta and therefore no RSI; its gain and loss still count as zero
/// in later windows.
///
/// # Edge cases
/// - `period == 0` => all `None`
/// - no movement in the window => 50.0
/// - no losses in the window => 100.0
pub fn rolling_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.is_empty() {
        return out;
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = std::iter::once((0.0, 0.0))
        .chain(closes.windows(2).map(|w| {
            let d = w[1] - w[0];
            (d.max(0.0), (-d).max(0.0))
        }))
        .unzip();

    // Each window is summed from its own slice; a running sum keeps float
    // residue after large moves leave the window.
    for i in 1..closes.len() {
        let lo = (i + 1).saturating_sub(period);
        let n = (i + 1 - lo) as f64;
        let avg_gain = gains[lo..=i].iter().sum::<f64>() / n;
        let avg_loss = losses[lo..=i].iter().sum::<f64>() / n;
        out[i] = rsi_from_averages(avg_gain, avg_loss);
    }

    out
}

/// Compute the Wilder RSI series for the given `closes` and `period`.
///
/// The returned vector has one RSI value for each close starting at index
/// `period` (the first `period` closes are consumed to seed the averages).
///
/// # Edge cases
/// - `period == 0` => empty vec
/// - `closes.len() < period + 1` => empty vec (need at least `period` deltas)
/// - If average loss is zero (no down moves), RSI is clamped to 100.0.
/// - Non-finite results are dropped and the series is truncated.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period + 1 {
        return Vec::new();
    }

    // --- Compute price deltas ------------------------------------------------
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    // --- Seed averages with SMA of first `period` deltas ---------------------
    let (sum_gain, sum_loss) = deltas[..period].iter().fold((0.0_f64, 0.0_f64), |(g, l), &d| {
        if d > 0.0 {
            (g + d, l)
        } else {
            (g, l + d.abs())
        }
    });

    let period_f = period as f64;
    let mut avg_gain = sum_gain / period_f;
    let mut avg_loss = sum_loss / period_f;

    let Some(first_rsi) = rsi_from_averages(avg_gain, avg_loss) else {
        return Vec::new();
    };

    let mut result = Vec::with_capacity(deltas.len() - period + 1);
    result.push(first_rsi);

    // --- Wilder's smoothing for subsequent values ----------------------------
    for &delta in &deltas[period..] {
        let gain = if delta > 0.0 { delta } else { 0.0 };
        let loss = if delta < 0.0 { delta.abs() } else { 0.0 };

        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;

        match rsi_from_averages(avg_gain, avg_loss) {
            Some(rsi) => result.push(rsi),
            None => break, // Non-finite — stop producing values.
        }
    }

    result
}

/// `|RSI - 50| / 50`: 0 at neutral, 1 at either extreme.
pub fn distance_from_neutral(rsi: f64) -> f64 {
    (rsi - 50.0).abs() / 50.0
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// - If both averages are zero, RSI is 50.0 (no movement).
/// - If average loss is zero (only gains), RSI is 100.0.
/// - Returns `None` when the result is non-finite.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    rsi.is_finite().then_some(rsi)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    // ---- rolling_rsi -----------------------------------------------------

    #[test]
    fn rolling_first_value_undefined() {
        let series = rolling_rsi(&[1.0, 2.0, 3.0], 14);
        assert_eq!(series.len(), 3);
        assert!(series[0].is_none());
        assert!(series[1].is_some());
    }

    #[test]
    fn rolling_period_zero() {
        assert!(rolling_rsi(&[1.0, 2.0], 0).iter().all(Option::is_none));
    }

    #[test]
    fn rolling_all_gains_is_100() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        for v in rolling_rsi(&closes, 14).into_iter().skip(1) {
            assert!((v.unwrap() - 100.0).abs() < 1e-10);
        }
    }

    #[test]
    fn rolling_all_losses_is_0() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        for v in rolling_rsi(&closes, 14).into_iter().skip(1) {
            assert!(v.unwrap().abs() < 1e-10);
        }
    }

    #[test]
    fn rolling_flat_is_neutral() {
        let series = rolling_rsi(&[100.0; 20], 5);
        for v in series.into_iter().skip(1) {
            assert!((v.unwrap() - 50.0).abs() < 1e-10);
        }
    }

    #[test]
    fn rolling_known_window() {
        // period 2: at i=3 the window holds deltas +2 (i=2) and -1 (i=3).
        let closes = [10.0, 11.0, 13.0, 12.0];
        let series = rolling_rsi(&closes, 2);
        let rs: f64 = (2.0 / 2.0) / (1.0 / 2.0);
        let expected = 100.0 - 100.0 / (1.0 + rs);
        assert!((series[3].unwrap() - expected).abs() < 1e-10);
        // i=1 window is [0 (first bar), +1]: only gains.
        assert!((series[1].unwrap() - 100.0).abs() < 1e-10);
    }

    #[test]
    fn rolling_range_check() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        for v in rolling_rsi(&closes, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }

    #[test]
    fn rolling_flat_window_after_large_moves_is_neutral() {
        let closes = [118.94, 26.95, 183.27, 95.34, 95.34, 95.34, 95.34];
        let series = rolling_rsi(&closes, 3);
        assert_eq!(series[6], Some(50.0));
        assert_eq!(distance_from_neutral(series[6].unwrap()), 0.0);
    }

    // ---- calculate_rsi (Wilder) ------------------------------------------

    #[test]
    fn wilder_insufficient_data() {
        assert!(calculate_rsi(&(1..=14).map(|x| x as f64).collect::<Vec<_>>(), 14).is_empty());
    }

    #[test]
    fn wilder_all_gains() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let series = calculate_rsi(&closes, 14);
        assert_eq!(series.len(), 30 - 14);
        assert!(series.iter().all(|v| (v - 100.0).abs() < 1e-10));
    }

    #[test]
    fn wilder_aligned_starts_at_period() {
        let closes: Vec<f64> = (1..=20).map(|x| (x as f64).sin() + 10.0).collect();
        let aligned = rsi_series(&closes, 5, RsiMethod::Wilder);
        assert_eq!(aligned.len(), 20);
        assert!(aligned[..5].iter().all(Option::is_none));
        assert!(aligned[5..].iter().all(Option::is_some));
    }

    #[test]
    fn distance_from_neutral_bounds() {
        assert_eq!(distance_from_neutral(50.0), 0.0);
        assert_eq!(distance_from_neutral(100.0), 1.0);
        assert_eq!(distance_from_neutral(0.0), 1.0);
        assert!((distance_from_neutral(75.0) - 0.5).abs() < 1e-12);
    }
}
