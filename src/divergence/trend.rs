// =============================================================================
// Trend Strength - rolling MACD anchors and the main-rise trigger
// =============================================================================
//
// For a lookback L (120 and 250):
//   anchor_L[i] = MACD[j] / 2 where j is the most recent row in [i-L, i]
//                 holding the window maximum, once i >= L;
//                 MACD[i] / 2 before that.
//
//   anchor_changed[i] = anchor_120[i] != anchor_120[i-1]   (true at row 0)
//   strong_zone[i]    = MACD[i] >= anchor_250[i]
//   main_rise[i]      = anchor_changed rose from false to true at i
//                       AND strong_zone rose from false to true at i
//
// The halving of the anchored maximum is a fixed formula constant.
// =============================================================================

use serde::Serialize;

pub const SHORT_ANCHOR_WINDOW: usize = 120;
pub const LONG_ANCHOR_WINDOW: usize = 250;
pub const ANCHOR_DIVISOR: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendColumns {
    pub anchor_120: Vec<f64>,
    pub anchor_250: Vec<f64>,
    pub anchor_changed: Vec<bool>,
    pub strong_zone: Vec<bool>,
    pub main_rise: Vec<bool>,
}

impl TrendColumns {
    pub fn compute(macd: &[f64]) -> Self {
        let anchor_120 = rolling_anchor(macd, SHORT_ANCHOR_WINDOW);
        let anchor_250 = rolling_anchor(macd, LONG_ANCHOR_WINDOW);

        let anchor_changed: Vec<bool> = (0..macd.len())
            .map(|i| i == 0 || anchor_120[i] != anchor_120[i - 1])
            .collect();
        let strong_zone: Vec<bool> = macd
            .iter()
            .zip(&anchor_250)
            .map(|(m, a)| m >= a)
            .collect();
        let main_rise = (0..macd.len())
            .map(|i| {
                i > 0
                    && anchor_changed[i]
                    && !anchor_changed[i - 1]
                    && strong_zone[i]
                    && !strong_zone[i - 1]
            })
            .collect();

        Self {
            anchor_120,
            anchor_250,
            anchor_changed,
            strong_zone,
            main_rise,
        }
    }
}

/// Row index of the window maximum in `values[start..=end]`, ties going to
/// the most recent row.
fn latest_argmax(values: &[f64], start: usize, end: usize) -> usize {
    let mut best = start;
    for j in start..=end {
        if values[j] >= values[best] {
            best = j;
        }
    }
    best
}

fn rolling_anchor(macd: &[f64], window: usize) -> Vec<f64> {
    (0..macd.len())
        .map(|i| {
            let j = if i >= window {
                latest_argmax(macd, i - window, i)
            } else {
                i
            };
            macd[j] / ANCHOR_DIVISOR
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_prefers_most_recent_tie() {
        assert_eq!(latest_argmax(&[1.0, 5.0, 2.0, 5.0, 0.0], 0, 4), 3);
        assert_eq!(latest_argmax(&[1.0, 5.0, 2.0, 5.0, 0.0], 0, 2), 1);
    }

    #[test]
    fn anchor_before_window_is_own_half() {
        let macd: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let t = TrendColumns::compute(&macd);
        assert_eq!(t.anchor_120[7], 3.5);
        assert_eq!(t.anchor_250[9], 4.5);
        // Before the long window fills, strong zone is just "MACD >= 0".
        assert!(t.strong_zone.iter().all(|&s| s));
    }

    #[test]
    fn anchor_holds_window_maximum() {
        let mut macd = vec![0.0; 300];
        macd[130] = 10.0;
        let t = TrendColumns::compute(&macd);
        assert_eq!(t.anchor_120[140], 5.0);
        assert_eq!(t.anchor_120[250], 5.0);
        // Maximum slides out of the window after 120 rows.
        assert_eq!(t.anchor_120[251], 0.0);
        assert!(t.anchor_changed[130]);
        assert!(!t.anchor_changed[131]);
    }

    #[test]
    fn main_rise_needs_both_edges() {
        // Negative histogram, then a jump above zero on day 5.
        let macd = vec![-1.0, -1.0, -1.0, -1.0, -1.0, 2.0, 3.0];
        let t = TrendColumns::compute(&macd);
        // Before 120 rows the anchor tracks MACD itself, so anchor_changed is
        // only false on flat stretches.
        assert!(!t.anchor_changed[4]);
        assert!(t.anchor_changed[5]);
        assert!(!t.strong_zone[4]);
        assert!(t.strong_zone[5]);
        assert!(t.main_rise[5]);
        assert!(!t.main_rise[6], "edges already consumed");
    }
}
