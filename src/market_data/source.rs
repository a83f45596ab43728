use anyhow::Result;
use async_trait::async_trait;

use crate::market_data::Candle;
use crate::types::{Interval, Period};

/// Anything that can produce historical bars for a symbol.
///
/// The production implementation is [`crate::yahoo::YahooClient`]; tests use
/// [`StaticSource`].
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch bars for `symbol` covering `period` at `interval` resolution,
    /// oldest first. An empty vector means the provider had no data.
    async fn fetch_bars(&self, symbol: &str, period: Period, interval: Interval)
        -> Result<Vec<Candle>>;

    /// Short provider name for logs and reports.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
pub use test_support::StaticSource;

#[cfg(test)]
mod test_support {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// In-memory source keyed by `(symbol, period, interval)`. Unknown keys
    /// return an empty series; keys registered with [`StaticSource::fail`]
    /// return an error.
    #[derive(Default)]
    pub struct StaticSource {
        series: HashMap<(String, Period, Interval), Vec<Candle>>,
        failures: HashMap<(String, Period, Interval), String>,
        calls: AtomicUsize,
    }

    impl StaticSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, symbol: &str, period: Period, interval: Interval, candles: Vec<Candle>) -> Self {
            self.series.insert((symbol.to_string(), period, interval), candles);
            self
        }

        pub fn fail(mut self, symbol: &str, period: Period, interval: Interval, msg: &str) -> Self {
            self.failures.insert((symbol.to_string(), period, interval), msg.to_string());
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PriceSource for StaticSource {
        async fn fetch_bars(
            &self,
            symbol: &str,
            period: Period,
            interval: Interval,
        ) -> Result<Vec<Candle>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let key = (symbol.to_string(), period, interval);
            if let Some(msg) = self.failures.get(&key) {
                anyhow::bail!("{msg}");
            }
            Ok(self.series.get(&key).cloned().unwrap_or_default())
        }

        fn name(&self) -> &'static str {
            "static"
        }
    }
}
