use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLCV bar as returned by the price source (oldest first in every
/// series).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time, UNIX seconds.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Scale the price fields by `factor` (dividend / split adjustment).
    pub fn adjusted(self, factor: f64) -> Self {
        Self {
            open: self.open * factor,
            high: self.high * factor,
            low: self.low * factor,
            close: self.close * factor,
            ..self
        }
    }
}

/// Close prices of `candles`, oldest first.
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjusted_scales_prices_not_volume() {
        let c = Candle::new(0, 10.0, 12.0, 8.0, 11.0, 500.0).adjusted(0.5);
        assert_eq!(c.open, 5.0);
        assert_eq!(c.high, 6.0);
        assert_eq!(c.low, 4.0);
        assert_eq!(c.close, 5.5);
        assert_eq!(c.volume, 500.0);
    }
}
