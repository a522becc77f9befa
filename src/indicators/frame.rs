// =============================================================================
// Indicator Frame - full per-symbol computation
// =============================================================================
//
// PriceSeries -> MACD columns -> swing extrema -> detector signal columns.
// Every column has the series' length and row i depends only on rows 0..=i,
// so the frame of a prefix equals the prefix of the frame.

use chrono::NaiveDate;
use serde::Serialize;

use crate::divergence::{self, SignalColumns};
use crate::error::SignalError;
use crate::indicators::macd::MacdColumns;
use crate::indicators::swing::SwingColumns;
use crate::types::PriceSeries;

/// Bars required before a series is analysed at all.
pub const MIN_HISTORY_BARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorFrame {
    pub symbol: String,
    pub dates: Vec<NaiveDate>,
    pub close: Vec<f64>,
    pub macd: MacdColumns,
    pub swings: SwingColumns,
    pub signals: SignalColumns,
}

impl IndicatorFrame {
    /// Compute the frame, failing with `InsufficientHistory` below
    /// [`MIN_HISTORY_BARS`].
    pub fn compute(series: &PriceSeries) -> Result<Self, SignalError> {
        if series.len() < MIN_HISTORY_BARS {
            return Err(SignalError::InsufficientHistory {
                symbol: series.symbol().to_string(),
                bars: series.len(),
                required: MIN_HISTORY_BARS,
            });
        }
        Ok(Self::compute_unchecked(series))
    }

    /// Compute without the history gate. Used for prefix comparisons.
    pub fn compute_unchecked(series: &PriceSeries) -> Self {
        let close = series.closes();
        let macd = MacdColumns::compute(&close);
        let swings = SwingColumns::compute(&close, &macd);
        let signals = divergence::detect(&macd, &swings);
        Self {
            symbol: series.symbol().to_string(),
            dates: series.dates(),
            close,
            macd,
            swings,
            signals,
        }
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.len().checked_sub(1)
    }
}
