// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators used by the
// advisor. Series are aligned to their input bars; undefined values are
// `None` so callers are forced to handle insufficient data.

pub mod levels;
pub mod rolling;
pub mod rsi;
