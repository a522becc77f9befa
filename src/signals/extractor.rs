// =============================================================================
// Signal Extractor - latest-day snapshot of a computed frame
// =============================================================================

use crate::error::SignalError;
use crate::indicators::{IndicatorFrame, MIN_HISTORY_BARS};
use crate::signals::snapshot::{SignalFlags, SignalSnapshot};
use crate::types::{PriceSeries, UniverseEntry};

/// Flags of frame row `i`.
pub fn flags_at(frame: &IndicatorFrame, i: usize) -> SignalFlags {
    let s = &frame.signals;
    SignalFlags {
        top_passivation: s.top_passivation[i],
        bottom_passivation: s.bottom_passivation[i],
        top_structure: s.top_structure[i],
        bottom_structure: s.bottom_structure[i],
        top_divergence: s.top_divergence[i],
        bottom_divergence: s.bottom_divergence[i],
        main_rise: s.trend.main_rise[i],
        top_established: s.top_established[i],
        bottom_established: s.bottom_established[i],
    }
}

/// Snapshot of row `i`, named after `entry`.
pub fn snapshot_at(frame: &IndicatorFrame, entry: &UniverseEntry, i: usize) -> SignalSnapshot {
    SignalSnapshot {
        code: entry.code.clone(),
        name: entry.name.clone(),
        date: frame.dates[i],
        close: frame.close[i],
        signals: flags_at(frame, i),
    }
}

/// Latest-day snapshot, or `None` when the frame is shorter than
/// [`MIN_HISTORY_BARS`].
pub fn latest_snapshot(frame: &IndicatorFrame, entry: &UniverseEntry) -> Option<SignalSnapshot> {
    if frame.len() < MIN_HISTORY_BARS {
        return None;
    }
    let last = frame.last_index()?;
    Some(snapshot_at(frame, entry, last))
}

/// Full per-symbol computation: frame, detector and extraction.
pub fn analyze_series(
    entry: &UniverseEntry,
    series: &PriceSeries,
) -> Result<SignalSnapshot, SignalError> {
    let frame = IndicatorFrame::compute(series)?;
    latest_snapshot(&frame, entry).ok_or_else(|| SignalError::InsufficientHistory {
        symbol: entry.code.clone(),
        bars: frame.len(),
        required: MIN_HISTORY_BARS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{rise_then_crash, series_from_closes};

    fn entry() -> UniverseEntry {
        UniverseEntry::new("600000", "浦发银行")
    }

    #[test]
    fn snapshot_comes_from_last_row() {
        let closes = rise_then_crash();
        let series = series_from_closes("600000", &closes);
        let snap = analyze_series(&entry(), &series).unwrap();
        assert_eq!(snap.code, "600000");
        assert_eq!(snap.name, "浦发银行");
        assert_eq!(snap.close, *closes.last().unwrap());
        assert_eq!(snap.date, series.bars().last().unwrap().date);
    }

    #[test]
    fn short_history_yields_no_snapshot() {
        let series = series_from_closes("600000", &[10.0; 80]);
        let frame = IndicatorFrame::compute_unchecked(&series);
        assert!(latest_snapshot(&frame, &entry()).is_none());
        assert!(matches!(
            analyze_series(&entry(), &series),
            Err(SignalError::InsufficientHistory { bars: 80, .. })
        ));
    }

    #[test]
    fn prefix_snapshot_matches_row_of_full_frame() {
        let closes: Vec<f64> = (0..260)
            .map(|i| {
                let t = i as f64;
                15.0 + 2.5 * (t / 11.0).sin() + 0.01 * t
            })
            .collect();
        let series = series_from_closes("000001", &closes);
        let full = IndicatorFrame::compute(&series).unwrap();
        for k in [119usize, 150, 200, 259] {
            let head = analyze_series(&entry(), &series.prefix(k + 1)).unwrap();
            assert_eq!(head, snapshot_at(&full, &entry(), k), "row {k}");
        }
    }

    #[test]
    fn main_rise_maps_from_trend_columns() {
        let series = series_from_closes("600000", &rise_then_crash());
        let mut frame = IndicatorFrame::compute(&series).unwrap();
        let last = frame.last_index().unwrap();
        frame.signals.trend.main_rise[last] = true;
        let snap = latest_snapshot(&frame, &entry()).unwrap();
        assert!(snap.signals.main_rise);
        assert!(!snap.signals.top_established);
    }
}
