// =============================================================================
// Shared types used across the signal engine
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::SignalError;

/// One trading day of prices for a single symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl PriceBar {
    /// Check the OHLC invariants: positive close, non-negative volume, and a
    /// high/low range that contains both open and close.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [self.open, self.high, self.low, self.close, self.volume];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(format!("{}: non-finite field", self.date));
        }
        if self.close <= 0.0 {
            return Err(format!("{}: close {} <= 0", self.date, self.close));
        }
        if self.volume < 0.0 {
            return Err(format!("{}: negative volume {}", self.date, self.volume));
        }
        if self.high < self.open.max(self.close).max(self.low) {
            return Err(format!("{}: high {} below body", self.date, self.high));
        }
        if self.low > self.open.min(self.close).min(self.high) {
            return Err(format!("{}: low {} above body", self.date, self.low));
        }
        Ok(())
    }
}

/// Date-ordered daily bars for one symbol. Immutable once built; every
/// indicator run reads it through `&self`.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series, rejecting invalid bars and non-increasing dates.
    pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self, SignalError> {
        let symbol = symbol.into();
        for bar in &bars {
            bar.validate().map_err(|reason| SignalError::MalformedSeries {
                symbol: symbol.clone(),
                reason,
            })?;
        }
        if let Some(w) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(SignalError::MalformedSeries {
                reason: format!("dates out of order at {} -> {}", w[0].date, w[1].date),
                symbol,
            });
        }
        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    /// The first `len` bars as a new series.
    #[cfg(test)]
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            symbol: self.symbol.clone(),
            bars: self.bars[..len.min(self.bars.len())].to_vec(),
        }
    }
}

/// A symbol in the scanned universe together with its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniverseEntry {
    pub code: String,
    pub name: String,
}

impl UniverseEntry {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

// =============================================================================
// Test fixtures
// =============================================================================

/// Build a series of flat-bodied bars (open = high = low = close) on
/// consecutive calendar days starting 2024-01-01.
#[cfg(test)]
pub fn series_from_closes(symbol: &str, closes: &[f64]) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PriceBar {
            date: start + chrono::Duration::days(i as i64),
            open: c,
            high: c,
            low: c,
            close: c,
            volume: 1_000.0,
        })
        .collect();
    PriceSeries::new(symbol, bars).unwrap()
}

/// 60 days of linear rise, a 40% slide over 10 days, then a flat tail of
/// 60 days (130 bars).
#[cfg(test)]
pub fn rise_then_crash() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..60).map(|i| 10.0 + 0.1 * i as f64).collect();
    let peak = closes[59];
    for k in 1..=10 {
        closes.push(peak * (1.0 - 0.04 * k as f64));
    }
    let floor = closes[69];
    closes.extend(std::iter::repeat(floor).take(60));
    closes
}

/// Double top (130 bars). After a 40-bar oscillating lead-in, a 30-day rally
/// runs into a 6-day pullback. A slower 20-day rally then makes a higher
/// price high on a weaker DIF, followed by a 40% slide over 10 days and a
/// flat tail.
#[cfg(test)]
pub fn double_top_then_slide() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..40).map(|i| 20.0 + (i as f64 / 4.0).sin()).collect();
    let base = closes[39];
    closes.extend((1..=30).map(|k| base + 0.1 * k as f64));
    let top = closes[69];
    closes.extend((1..=6).map(|k| top - 0.15 * k as f64));
    let trough = closes[75];
    closes.extend((1..=20).map(|k| trough + 0.08 * k as f64));
    let peak = closes[95];
    closes.extend((1..=10).map(|k| peak * (1.0 - 0.04 * k as f64)));
    let floor = closes[105];
    closes.extend(std::iter::repeat(floor).take(24));
    closes
}
