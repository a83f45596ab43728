// =============================================================================
// Shared types used across the advisor
// =============================================================================

use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// Period
// =============================================================================

/// Amount of history requested from the data provider.
///
/// `7d` and `60d` are never offered to the user; they only appear as
/// auto-fix fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "7d")]
    Days7,
    #[serde(rename = "60d")]
    Days60,
    #[serde(rename = "1mo")]
    Month1,
    #[serde(rename = "3mo")]
    Month3,
    #[serde(rename = "6mo")]
    Month6,
    #[serde(rename = "1y")]
    Year1,
    #[serde(rename = "2y")]
    Year2,
    #[serde(rename = "5y")]
    Year5,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    /// Periods offered in the dashboard selector, in display order.
    pub const SELECTABLE: [Period; 7] = [
        Period::Month1,
        Period::Month3,
        Period::Month6,
        Period::Year1,
        Period::Year2,
        Period::Year5,
        Period::Max,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Days7 => "7d",
            Self::Days60 => "60d",
            Self::Month1 => "1mo",
            Self::Month3 => "3mo",
            Self::Month6 => "6mo",
            Self::Year1 => "1y",
            Self::Year2 => "2y",
            Self::Year5 => "5y",
            Self::Max => "max",
        }
    }

    /// Approximate calendar length in days. `None` for `max`.
    pub fn approx_days(&self) -> Option<u32> {
        match self {
            Self::Days7 => Some(7),
            Self::Days60 => Some(60),
            Self::Month1 => Some(31),
            Self::Month3 => Some(92),
            Self::Month6 => Some(183),
            Self::Year1 => Some(366),
            Self::Year2 => Some(731),
            Self::Year5 => Some(1827),
            Self::Max => None,
        }
    }

    /// Whether the provider serves `interval` bars this far back.
    pub fn supports(&self, interval: Interval) -> bool {
        match (self.approx_days(), interval.max_lookback_days()) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(days), Some(limit)) => days <= limit,
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "7d" => Ok(Self::Days7),
            "60d" => Ok(Self::Days60),
            "1mo" => Ok(Self::Month1),
            "3mo" => Ok(Self::Month3),
            "6mo" => Ok(Self::Month6),
            "1y" => Ok(Self::Year1),
            "2y" => Ok(Self::Year2),
            "5y" => Ok(Self::Year5),
            "max" => Ok(Self::Max),
            other => Err(format!("unknown period '{other}'")),
        }
    }
}

// =============================================================================
// Interval
// =============================================================================

/// Bar width requested from the data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "1wk")]
    Week1,
}

impl Interval {
    pub const SELECTABLE: [Interval; 7] = [
        Interval::Minute1,
        Interval::Minute5,
        Interval::Minute15,
        Interval::Minute30,
        Interval::Hour1,
        Interval::Day1,
        Interval::Week1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minute1 => "1m",
            Self::Minute5 => "5m",
            Self::Minute15 => "15m",
            Self::Minute30 => "30m",
            Self::Hour1 => "1h",
            Self::Day1 => "1d",
            Self::Week1 => "1wk",
        }
    }

    /// How far back the provider keeps bars of this width. `None` = no limit.
    pub fn max_lookback_days(&self) -> Option<u32> {
        match self {
            Self::Minute1 => Some(7),
            Self::Minute5 | Self::Minute15 | Self::Minute30 => Some(60),
            Self::Hour1 => Some(730),
            Self::Day1 | Self::Week1 => None,
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1m" => Ok(Self::Minute1),
            "5m" => Ok(Self::Minute5),
            "15m" => Ok(Self::Minute15),
            "30m" => Ok(Self::Minute30),
            "1h" | "60m" => Ok(Self::Hour1),
            "1d" => Ok(Self::Day1),
            "1wk" => Ok(Self::Week1),
            other => Err(format!("unknown interval '{other}'")),
        }
    }
}

// =============================================================================
// Recommendation enums
// =============================================================================

/// Final recommendation for the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Wait,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Wait => "WAIT",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            "WAIT" => Ok(Self::Wait),
            other => Err(format!("unknown action '{other}'")),
        }
    }
}

/// Overbought / oversold classification of an RSI reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RsiZone {
    Overbought,
    Oversold,
    Neutral,
}

impl RsiZone {
    pub fn classify(rsi: f64, overbought: f64, oversold: f64) -> Self {
        if rsi >= overbought {
            Self::Overbought
        } else if rsi <= oversold {
            Self::Oversold
        } else {
            Self::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overbought => "OVERBOUGHT",
            Self::Oversold => "OVERSOLD",
            Self::Neutral => "NEUTRAL",
        }
    }
}

impl std::fmt::Display for RsiZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RsiZone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "OVERBOUGHT" => Ok(Self::Overbought),
            "OVERSOLD" => Ok(Self::Oversold),
            "NEUTRAL" => Ok(Self::Neutral),
            other => Err(format!("unknown rsi zone '{other}'")),
        }
    }
}

/// Where the close sits relative to the smoothed midline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceBias {
    /// Close below the midline: price is likely to reach the buy level.
    TowardSupport,
    /// Close above the midline: price is likely to reach the sell level.
    TowardResistance,
    AtMidline,
}

impl PriceBias {
    pub fn from_close(close: f64, midline: f64) -> Self {
        if close < midline {
            Self::TowardSupport
        } else if close > midline {
            Self::TowardResistance
        } else {
            Self::AtMidline
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TowardSupport => "toward_support",
            Self::TowardResistance => "toward_resistance",
            Self::AtMidline => "at_midline",
        }
    }
}

impl std::fmt::Display for PriceBias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceBias {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "toward_support" => Ok(Self::TowardSupport),
            "toward_resistance" => Ok(Self::TowardResistance),
            "at_midline" => Ok(Self::AtMidline),
            other => Err(format!("unknown price bias '{other}'")),
        }
    }
}

/// Averaging scheme used for RSI gains and losses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiMethod {
    /// Arithmetic rolling mean over the last `period` deltas.
    #[default]
    Simple,
    /// SMA seed followed by Wilder's smoothing.
    Wilder,
}

impl std::fmt::Display for RsiMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Wilder => write!(f, "wilder"),
        }
    }
}

impl FromStr for RsiMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "wilder" => Ok(Self::Wilder),
            other => Err(format!("unknown rsi method '{other}' (expected simple or wilder)")),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_parses_wire_strings() {
        for p in Period::SELECTABLE {
            assert_eq!(p.as_str().parse::<Period>().unwrap(), p);
        }
        assert_eq!("60d".parse::<Period>().unwrap(), Period::Days60);
        assert!("10y".parse::<Period>().is_err());
    }

    #[test]
    fn interval_accepts_60m_alias() {
        assert_eq!("60m".parse::<Interval>().unwrap(), Interval::Hour1);
        assert_eq!(" 5M ".parse::<Interval>().unwrap(), Interval::Minute5);
    }

    #[test]
    fn provider_lookback_limits() {
        assert!(Period::Month1.supports(Interval::Minute5));
        assert!(Period::Days7.supports(Interval::Minute1));
        assert!(!Period::Month1.supports(Interval::Minute1));
        assert!(!Period::Month3.supports(Interval::Minute15));
        assert!(Period::Year1.supports(Interval::Hour1));
        assert!(!Period::Year2.supports(Interval::Hour1));
        assert!(Period::Max.supports(Interval::Day1));
        assert!(!Period::Max.supports(Interval::Hour1));
    }

    #[test]
    fn serde_uses_wire_strings() {
        assert_eq!(serde_json::to_string(&Period::Month1).unwrap(), "\"1mo\"");
        assert_eq!(serde_json::to_string(&Interval::Week1).unwrap(), "\"1wk\"");
        assert_eq!(serde_json::to_string(&Action::Wait).unwrap(), "\"WAIT\"");
        assert_eq!(
            serde_json::to_string(&PriceBias::TowardSupport).unwrap(),
            "\"toward_support\""
        );
    }

    #[test]
    fn rsi_zone_thresholds_are_inclusive() {
        assert_eq!(RsiZone::classify(70.0, 70.0, 30.0), RsiZone::Overbought);
        assert_eq!(RsiZone::classify(30.0, 70.0, 30.0), RsiZone::Oversold);
        assert_eq!(RsiZone::classify(50.0, 70.0, 30.0), RsiZone::Neutral);
    }

    #[test]
    fn enums_parse_and_display_wire_strings() {
        for a in [Action::Buy, Action::Sell, Action::Wait] {
            assert_eq!(a.to_string().parse::<Action>().unwrap(), a);
        }
        assert_eq!("buy".parse::<Action>().unwrap(), Action::Buy);

        for z in [RsiZone::Overbought, RsiZone::Oversold, RsiZone::Neutral] {
            assert_eq!(z.to_string().parse::<RsiZone>().unwrap(), z);
        }
        assert_eq!(RsiZone::Oversold.to_string(), "OVERSOLD");

        assert_eq!(PriceBias::AtMidline.to_string(), "at_midline");
        assert_eq!(
            "toward_resistance".parse::<PriceBias>().unwrap(),
            PriceBias::TowardResistance
        );

        assert_eq!("Wilder".parse::<RsiMethod>().unwrap(), RsiMethod::Wilder);
        assert_eq!(RsiMethod::Simple.to_string().parse::<RsiMethod>().unwrap(), RsiMethod::Simple);
        assert!("ema".parse::<RsiMethod>().is_err());
        assert!("hold".parse::<Action>().is_err());
    }

    #[test]
    fn bias_from_close() {
        assert_eq!(PriceBias::from_close(9.0, 10.0), PriceBias::TowardSupport);
        assert_eq!(PriceBias::from_close(11.0, 10.0), PriceBias::TowardResistance);
        assert_eq!(PriceBias::from_close(10.0, 10.0), PriceBias::AtMidline);
    }
}
