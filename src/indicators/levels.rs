// =============================================================================
// RSI-Adjusted Support / Resistance
// =============================================================================
//
// Base levels are the rolling min / max of the close over `lookback` bars.
// The further RSI sits from neutral, the wider the levels are pushed apart:
//
//   rsi_diff       = |RSI - 50| / 50
//   range          = base_resistance - base_support
//   adj_support    = base_support    - rsi_diff * range
//   adj_resistance = base_resistance + rsi_diff * range
//   midline        = (adj_support + adj_resistance) / 2
//
// The adjusted levels and midline are then smoothed with a rolling mean of
// `smooth_length` bars. Only bars where every smoothed level and RSI exist
// are "valid" and take part in signal detection.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::AdvisorError;
use crate::indicators::rolling::{defined, rolling_max, rolling_mean, rolling_min};
use crate::indicators::rsi::{self, distance_from_neutral, rsi_series};
use crate::market_data::candle::{closes, Candle};
use crate::types::RsiMethod;

pub const MIN_LOOKBACK: usize = 5;
pub const MAX_LOOKBACK: usize = 1000;
pub const MIN_SMOOTH: usize = 1;
pub const MAX_SMOOTH: usize = 200;

/// Tunable inputs of the level computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelParams {
    pub rsi_period: usize,
    pub lookback: usize,
    pub smooth_length: usize,
    #[serde(default)]
    pub rsi_method: RsiMethod,
}

impl Default for LevelParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            lookback: 50,
            smooth_length: 5,
            rsi_method: RsiMethod::Simple,
        }
    }
}

impl LevelParams {
    /// Reject values outside the ranges offered by the dashboard.
    pub fn validate(&self) -> Result<(), AdvisorError> {
        check_range("rsi_period", self.rsi_period, rsi::MIN_PERIOD, rsi::MAX_PERIOD)?;
        check_range("lookback", self.lookback, MIN_LOOKBACK, MAX_LOOKBACK)?;
        check_range("smooth", self.smooth_length, MIN_SMOOTH, MAX_SMOOTH)?;
        Ok(())
    }

    /// Minimum number of bars before the first valid row can appear.
    pub fn warmup_bars(&self) -> usize {
        self.lookback + self.smooth_length - 1
    }
}

fn check_range(name: &str, value: usize, min: usize, max: usize) -> Result<(), AdvisorError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(AdvisorError::InvalidParameter(format!(
            "{name} must be between {min} and {max}, got {value}"
        )))
    }
}

/// Every intermediate value for one bar. `None` = not enough history yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelRow {
    pub timestamp: i64,
    pub close: f64,
    pub rsi: Option<f64>,
    pub rsi_diff: Option<f64>,
    pub base_support: Option<f64>,
    pub base_resistance: Option<f64>,
    pub range: Option<f64>,
    pub adj_support: Option<f64>,
    pub adj_resistance: Option<f64>,
    pub midline: Option<f64>,
    pub smooth_support: Option<f64>,
    pub smooth_resistance: Option<f64>,
    pub smooth_midline: Option<f64>,
}

/// A bar with every level defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidRow {
    pub timestamp: i64,
    pub close: f64,
    pub rsi: f64,
    pub base_support: f64,
    pub base_resistance: f64,
    pub range: f64,
    pub adj_support: f64,
    pub adj_resistance: f64,
    pub smooth_support: f64,
    pub smooth_resistance: f64,
    pub smooth_midline: f64,
}

impl LevelRow {
    pub fn to_valid(&self) -> Option<ValidRow> {
        Some(ValidRow {
            timestamp: self.timestamp,
            close: self.close,
            rsi: self.rsi?,
            base_support: self.base_support?,
            base_resistance: self.base_resistance?,
            range: self.range?,
            adj_support: self.adj_support?,
            adj_resistance: self.adj_resistance?,
            smooth_support: self.smooth_support?,
            smooth_resistance: self.smooth_resistance?,
            smooth_midline: self.smooth_midline?,
        })
    }
}

/// Combine two aligned series element-wise where both are defined.
fn zip_with<F>(a: &[Option<f64>], b: &[Option<f64>], f: F) -> Vec<Option<f64>>
where
    F: Fn(f64, f64) -> f64,
{
    a.iter()
        .zip(b)
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => Some(f(*x, *y)).filter(|v| v.is_finite()),
            _ => None,
        })
        .collect()
}

/// Compute every level for every bar of `candles`.
pub fn compute_levels(candles: &[Candle], params: &LevelParams) -> Vec<LevelRow> {
    let close = closes(candles);
    let close_opt = defined(&close);

    let rsi = rsi_series(&close, params.rsi_period, params.rsi_method);
    let rsi_diff: Vec<Option<f64>> = rsi.iter().map(|r| r.map(distance_from_neutral)).collect();

    let base_support = rolling_min(&close_opt, params.lookback);
    let base_resistance = rolling_max(&close_opt, params.lookback);
    let range = zip_with(&base_resistance, &base_support, |r, s| r - s);

    let spread = zip_with(&rsi_diff, &range, |d, r| d * r);
    let adj_support = zip_with(&base_support, &spread, |s, w| s - w);
    let adj_resistance = zip_with(&base_resistance, &spread, |r, w| r + w);
    let midline = zip_with(&adj_support, &adj_resistance, |s, r| (s + r) / 2.0);

    let smooth_support = rolling_mean(&adj_support, params.smooth_length);
    let smooth_resistance = rolling_mean(&adj_resistance, params.smooth_length);
    let smooth_midline = rolling_mean(&midline, params.smooth_length);

    candles
        .iter()
        .enumerate()
        .map(|(i, c)| LevelRow {
            timestamp: c.timestamp,
            close: c.close,
            rsi: rsi[i],
            rsi_diff: rsi_diff[i],
            base_support: base_support[i],
            base_resistance: base_resistance[i],
            range: range[i],
            adj_support: adj_support[i],
            adj_resistance: adj_resistance[i],
            midline: midline[i],
            smooth_support: smooth_support[i],
            smooth_resistance: smooth_resistance[i],
            smooth_midline: smooth_midline[i],
        })
        .collect()
}

/// Keep only the rows with every level defined, in order.
pub fn valid_rows(rows: &[LevelRow]) -> Vec<ValidRow> {
    rows.iter().filter_map(LevelRow::to_valid).collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn candles_from(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(i as i64 * 60, c, c, c, c, 1.0))
            .collect()
    }

    fn params(rsi_period: usize, lookback: usize, smooth_length: usize) -> LevelParams {
        LevelParams {
            rsi_period,
            lookback,
            smooth_length,
            rsi_method: RsiMethod::Simple,
        }
    }

    #[test]
    fn validate_bounds() {
        assert!(LevelParams::default().validate().is_ok());
        assert!(params(1, 50, 5).validate().is_err());
        assert!(params(14, 4, 5).validate().is_err());
        assert!(params(14, 50, 0).validate().is_err());
        assert!(params(14, 1001, 5).validate().is_err());
        assert!(params(100, 1000, 200).validate().is_ok());
    }

    #[test]
    fn flat_series_has_zero_range() {
        let rows = compute_levels(&candles_from(&[10.0; 20]), &params(3, 5, 2));
        let valid = valid_rows(&rows);
        assert_eq!(valid.len(), 20 - (5 + 2 - 1) + 1);
        for r in valid {
            assert_eq!(r.range, 0.0);
            assert_eq!(r.smooth_support, 10.0);
            assert_eq!(r.smooth_resistance, 10.0);
            assert_eq!(r.smooth_midline, 10.0);
        }
    }

    #[test]
    fn first_valid_row_after_warmup() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 * 0.7).sin()).collect();
        let p = params(14, 5, 3);
        let rows = compute_levels(&candles_from(&closes), &p);
        let first = rows.iter().position(|r| r.to_valid().is_some()).unwrap();
        assert_eq!(first, p.warmup_bars() - 1);
    }

    #[test]
    fn adjusted_levels_formula() {
        // Rising series: RSI = 100 => rsi_diff = 1 => bands widen by one range.
        let closes: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let rows = compute_levels(&candles_from(&closes), &params(3, 5, 1));
        let last = rows.last().unwrap().to_valid().unwrap();
        assert_eq!(last.base_support, 6.0);
        assert_eq!(last.base_resistance, 10.0);
        assert_eq!(last.range, 4.0);
        assert!((last.rsi - 100.0).abs() < 1e-10);
        assert!((last.adj_support - 2.0).abs() < 1e-10);
        assert!((last.adj_resistance - 14.0).abs() < 1e-10);
        assert!((last.smooth_midline - 8.0).abs() < 1e-10);
    }

    #[test]
    fn smoothing_averages_adjusted_levels() {
        let closes: Vec<f64> = (1..=12).map(|x| x as f64).collect();
        let rows = compute_levels(&candles_from(&closes), &params(3, 5, 3));
        let n = rows.len();
        let expected = (rows[n - 1].adj_support.unwrap()
            + rows[n - 2].adj_support.unwrap()
            + rows[n - 3].adj_support.unwrap())
            / 3.0;
        assert!((rows[n - 1].smooth_support.unwrap() - expected).abs() < 1e-10);
    }

    #[test]
    fn too_few_bars_yields_no_valid_rows() {
        let rows = compute_levels(&candles_from(&[1.0, 2.0, 3.0]), &LevelParams::default());
        assert_eq!(rows.len(), 3);
        assert!(valid_rows(&rows).is_empty());
    }
}
