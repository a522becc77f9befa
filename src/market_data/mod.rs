// =============================================================================
// Market Data Module
// =============================================================================
//
// Upstream adapters for the engine:
// - `OhlcSource` / `UniverseSource` seams
// - Eastmoney daily kline client
// - CSV universe with optional supplement

pub mod eastmoney;
pub mod source;
pub mod universe;

pub use eastmoney::EastmoneyClient;
pub use source::{OhlcSource, UniverseSource};
pub use universe::{validate_symbol, MergedUniverse};
