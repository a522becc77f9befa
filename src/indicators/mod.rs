// =============================================================================
// Indicator Pipeline
// =============================================================================
//
// Pure, side-effect-free transforms from a daily close series to the aligned
// indicator frame: EMA, the MACD family, crossover bookkeeping and swing
// extrema. No function here reads beyond row i when producing row i.

pub mod crossover;
pub mod ema;
pub mod frame;
pub mod macd;
pub mod swing;

pub use frame::{IndicatorFrame, MIN_HISTORY_BARS};
