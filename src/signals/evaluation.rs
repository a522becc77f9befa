// =============================================================================
// Signal Queries & Forward Evaluation
// =============================================================================
//
// Read-side helpers over a snapshot set:
// - Filter by a named signal, or by "any signal true".
// - Classify a snapshot as bullish/bearish from its active signals.
// - Score a historical snapshot against the closes that followed it: the
//   call is correct when the sign of the cumulative forward return matches
//   the classification.
// - Replay a symbol's frame and score every past signalling day.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::indicators::IndicatorFrame;
use crate::signals::extractor::snapshot_at;
use crate::signals::snapshot::{SignalFlags, SignalKind, SignalSnapshot};
use crate::types::{PriceSeries, UniverseEntry};

/// Snapshots with `kind` true, or with any signal true when `kind` is `None`.
pub fn filter_signals(snapshots: &[SignalSnapshot], kind: Option<SignalKind>) -> Vec<&SignalSnapshot> {
    snapshots
        .iter()
        .filter(|s| match kind {
            Some(k) => s.signals.get(k),
            None => s.signals.any(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Bias {
    Bullish,
    Bearish,
}

/// Bias of a snapshot's active signals. Mixed or empty sets have no bias.
pub fn classify(flags: &SignalFlags) -> Option<Bias> {
    let mut active = flags.active().peekable();
    active.peek()?;
    let (bull, bear): (Vec<SignalKind>, Vec<SignalKind>) = active.partition(|k| k.is_bullish());
    match (bull.is_empty(), bear.is_empty()) {
        (false, true) => Some(Bias::Bullish),
        (true, false) => Some(Bias::Bearish),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForwardEvaluation {
    pub code: String,
    pub date: NaiveDate,
    pub signals: SignalFlags,
    pub bias: Option<Bias>,
    /// Closes of the bars after the snapshot date, at most `horizon` of them.
    pub trajectory: Vec<f64>,
    /// Cumulative return vs the snapshot close for each trajectory point.
    pub cumulative_returns: Vec<f64>,
    pub cumulative_return: Option<f64>,
    /// `None` when there is no bias or no forward data yet.
    pub correct: Option<bool>,
}

/// Score one snapshot against the subsequent bars of `series`.
pub fn evaluate_forward(
    snapshot: &SignalSnapshot,
    series: &PriceSeries,
    horizon: usize,
) -> ForwardEvaluation {
    let trajectory: Vec<f64> = series
        .bars()
        .iter()
        .filter(|b| b.date > snapshot.date)
        .take(horizon)
        .map(|b| b.close)
        .collect();
    let cumulative_returns: Vec<f64> = trajectory
        .iter()
        .map(|c| c / snapshot.close - 1.0)
        .collect();
    let cumulative_return = cumulative_returns.last().copied();
    let bias = classify(&snapshot.signals);

    let correct = match (bias, cumulative_return) {
        (Some(Bias::Bullish), Some(r)) => Some(r > 0.0),
        (Some(Bias::Bearish), Some(r)) => Some(r < 0.0),
        _ => None,
    };

    ForwardEvaluation {
        code: snapshot.code.clone(),
        date: snapshot.date,
        signals: snapshot.signals,
        bias,
        trajectory,
        cumulative_returns,
        cumulative_return,
        correct,
    }
}

/// Score every signalling snapshot of a historical set. Symbols without a
/// series in `prices` are skipped.
pub fn evaluate_set(
    snapshots: &[SignalSnapshot],
    prices: &HashMap<String, PriceSeries>,
    horizon: usize,
) -> Vec<ForwardEvaluation> {
    filter_signals(snapshots, None)
        .into_iter()
        .filter_map(|s| prices.get(&s.code).map(|p| evaluate_forward(s, p, horizon)))
        .collect()
}

/// Replay `frame` day by day and score each day on which `kind` (or any signal) fired against the later bars of
/// `series`.
pub fn evaluate_history(
    frame: &IndicatorFrame,
    entry: &UniverseEntry,
    series: &PriceSeries,
    kind: Option<SignalKind>,
    horizon: usize,
) -> Vec<ForwardEvaluation> {
    let snapshots: Vec<SignalSnapshot> = (0..frame.len())
        .map(|i| snapshot_at(frame, entry, i))
        .collect();
    let selected: Vec<SignalSnapshot> = filter_signals(&snapshots, kind).into_iter().cloned().collect();
    let prices = HashMap::from([(entry.code.clone(), series.clone())]);
    evaluate_set(&selected, &prices, horizon)
}

/// Fraction of scored evaluations that were correct.
pub fn hit_rate(evals: &[ForwardEvaluation]) -> Option<f64> {
    let scored: Vec<bool> = evals.iter().filter_map(|e| e.correct).collect();
    if scored.is_empty() {
        return None;
    }
    Some(scored.iter().filter(|&&c| c).count() as f64 / scored.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{double_top_then_slide, series_from_closes};

    fn snap(code: &str, day: u32, close: f64, flags: SignalFlags) -> SignalSnapshot {
        SignalSnapshot {
            code: code.into(),
            name: code.into(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            close,
            signals: flags,
        }
    }

    #[test]
    fn filter_by_kind_and_any() {
        let bottom = SignalFlags {
            bottom_divergence: true,
            ..Default::default()
        };
        let set = vec![
            snap("600000", 1, 10.0, bottom),
            snap("600001", 1, 10.0, SignalFlags::default()),
        ];
        assert_eq!(filter_signals(&set, None).len(), 1);
        assert_eq!(filter_signals(&set, Some(SignalKind::BottomDivergence)).len(), 1);
        assert!(filter_signals(&set, Some(SignalKind::MainRise)).is_empty());
    }

    #[test]
    fn classify_mixed_has_no_bias() {
        let mixed = SignalFlags {
            top_divergence: true,
            bottom_divergence: true,
            ..Default::default()
        };
        assert_eq!(classify(&mixed), None);
        assert_eq!(classify(&SignalFlags::default()), None);
        let bear = SignalFlags {
            top_established: true,
            ..Default::default()
        };
        assert_eq!(classify(&bear), Some(Bias::Bearish));
    }

    #[test]
    fn bullish_call_scored_against_forward_closes() {
        // Series starts 2024-01-01; snapshot on 2024-01-03 at close 12.
        let series = series_from_closes("600000", &[10.0, 11.0, 12.0, 12.6, 13.2, 11.0]);
        let flags = SignalFlags {
            main_rise: true,
            ..Default::default()
        };
        let eval = evaluate_forward(&snap("600000", 3, 12.0, flags), &series, 2);
        assert_eq!(eval.trajectory, vec![12.6, 13.2]);
        assert!((eval.cumulative_return.unwrap() - 0.1).abs() < 1e-9);
        assert_eq!(eval.correct, Some(true));

        let eval = evaluate_forward(&snap("600000", 3, 12.0, flags), &series, 10);
        assert_eq!(eval.correct, Some(false));
    }

    #[test]
    fn no_forward_data_is_unscored() {
        let series = series_from_closes("600000", &[10.0, 11.0]);
        let flags = SignalFlags {
            top_divergence: true,
            ..Default::default()
        };
        let eval = evaluate_forward(&snap("600000", 2, 11.0, flags), &series, 5);
        assert!(eval.trajectory.is_empty());
        assert_eq!(eval.correct, None);
    }

    #[test]
    fn hit_rate_over_set() {
        let series = series_from_closes("600000", &[10.0, 9.0, 8.0]);
        let mut prices = HashMap::new();
        prices.insert("600000".to_string(), series);
        let top = SignalFlags {
            top_passivation: true,
            ..Default::default()
        };
        let bottom = SignalFlags {
            bottom_passivation: true,
            ..Default::default()
        };
        let set = vec![
            snap("600000", 1, 10.0, top),
            snap("600000", 1, 10.0, bottom),
            snap("999999", 1, 10.0, top),
        ];
        let evals = evaluate_set(&set, &prices, 2);
        assert_eq!(evals.len(), 2);
        assert_eq!(hit_rate(&evals), Some(0.5));
    }

    #[test]
    fn history_replay_scores_the_established_top() {
        let series = series_from_closes("600000", &double_top_then_slide());
        let frame = IndicatorFrame::compute(&series).unwrap();
        let entry = UniverseEntry::new("600000", "浦发银行");

        let evals = evaluate_history(&frame, &entry, &series, Some(SignalKind::TopEstablished), 5);
        assert_eq!(evals.len(), 1);
        let e = &evals[0];
        assert_eq!(e.date, frame.dates[96]);
        assert!(e.signals.top_established);
        assert_eq!(e.bias, Some(Bias::Bearish));
        assert_eq!(e.trajectory.len(), 5);
        assert_eq!(e.correct, Some(true));
        assert_eq!(hit_rate(&evals), Some(1.0));

        let any = evaluate_history(&frame, &entry, &series, None, 5);
        assert!(any.len() > evals.len());
        assert!(any.iter().any(|e| e.date == frame.dates[96]));
        assert!(any.windows(2).all(|w| w[0].date < w[1].date));
    }
}
