pub mod cache;
pub mod candle;
pub mod loader;
pub mod source;

// Re-export the Candle struct for convenient access (e.g. `use crate::market_data::Candle`).
pub use cache::{SeriesCache, SeriesKey};
pub use candle::Candle;
pub use loader::{FetchAttempt, LoadOutcome};
pub use source::PriceSource;
