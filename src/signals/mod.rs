// =============================================================================
// Signals Module
// =============================================================================
//
// Snapshot side of the engine:
// - Nine-key snapshot and refresh-cycle set types
// - Latest-row extraction from a computed frame
// - Query and forward-return evaluation helpers

pub mod evaluation;
pub mod extractor;
pub mod snapshot;

pub use evaluation::{evaluate_history, filter_signals, hit_rate, ForwardEvaluation};
pub use extractor::analyze_series;
pub use snapshot::{SignalKind, SignalSet, SignalSnapshot};
