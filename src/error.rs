// =============================================================================
// Per-symbol error taxonomy
// =============================================================================
//
// Every failure that can happen while turning one symbol into a snapshot is a
// `SignalError`. None of them crosses the symbol boundary: the orchestrator
// converts each one into a counted non-result. Run-level failures (universe,
// config, persistence) use `anyhow` instead.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    /// Fetch failed or timed out. The only retryable variant.
    #[error("upstream unavailable for {symbol}: {reason}")]
    UpstreamUnavailable { symbol: String, reason: String },

    #[error("insufficient history for {symbol}: {bars} bars < {required}")]
    InsufficientHistory {
        symbol: String,
        bars: usize,
        required: usize,
    },

    #[error("malformed universe entry {symbol:?}: {reason}")]
    MalformedUniverseEntry { symbol: String, reason: String },

    #[error("malformed price series for {symbol}: {reason}")]
    MalformedSeries { symbol: String, reason: String },

    #[error("computation failed for {symbol}: {reason}")]
    Computation { symbol: String, reason: String },
}

impl SignalError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. })
    }

    /// Whether this outcome means "no snapshot" rather than a failure.
    /// Short or empty histories are ordinary for newly listed symbols.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            Self::InsufficientHistory { .. } | Self::MalformedSeries { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::InsufficientHistory { .. } => "insufficient_history",
            Self::MalformedUniverseEntry { .. } => "malformed_universe_entry",
            Self::MalformedSeries { .. } => "malformed_series",
            Self::Computation { .. } => "computation",
        }
    }
}
