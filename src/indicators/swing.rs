// =============================================================================
// Swing Extrema - price and DIF peaks/troughs per cross-delimited window
// =============================================================================
//
// Level 1 is the current swing: the window that starts one day before the
// latest cross and ends today.
//
//   CH1[i]   = max(close[i - M1[i] - 1 ..= i])            (clipped at 0)
//   CH2[i]   = CH1[i - M1[i] - 1]   if >= 2 golden crosses so far, else 0
//   CH3[i]   = CH2[i - M1[i] - 1]   if >= 3 golden crosses so far, else 0
//
// DIFH1..3 apply the same recurrence to DIF. CL1..3 / DIFL1..3 mirror it with
// N1, death crosses and minima. Level k reads only level k-1 at an earlier
// row, so every column is filled by a single forward pass.
// =============================================================================

use serde::Serialize;

use crate::indicators::macd::MacdColumns;

/// Three levels of swing extrema for one side (highs or lows).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SwingLevels {
    pub price: [Vec<f64>; 3],
    pub dif: [Vec<f64>; 3],
}

impl SwingLevels {
    fn with_len(n: usize) -> Self {
        let zeros = || vec![0.0; n];
        Self {
            price: [zeros(), zeros(), zeros()],
            dif: [zeros(), zeros(), zeros()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwingColumns {
    /// CH1..CH3 / DIFH1..DIFH3, delimited by golden crosses.
    pub highs: SwingLevels,
    /// CL1..CL3 / DIFL1..DIFL3, delimited by death crosses.
    pub lows: SwingLevels,
}

#[derive(Clone, Copy)]
enum Side {
    High,
    Low,
}

impl Side {
    fn pick(self, a: f64, b: f64) -> f64 {
        match self {
            Side::High => a.max(b),
            Side::Low => a.min(b),
        }
    }
}

impl SwingColumns {
    pub fn compute(close: &[f64], macd: &MacdColumns) -> Self {
        Self {
            highs: levels(close, &macd.dif, &macd.m1, &macd.golden_count, Side::High),
            lows: levels(close, &macd.dif, &macd.n1, &macd.death_count, Side::Low),
        }
    }
}

fn window_extreme(values: &[f64], start: usize, end: usize, side: Side) -> f64 {
    values[start..=end]
        .iter()
        .copied()
        .reduce(|a, b| side.pick(a, b))
        .unwrap_or(0.0)
}

fn levels(
    close: &[f64],
    dif: &[f64],
    since: &[usize],
    crosses: &[usize],
    side: Side,
) -> SwingLevels {
    let n = close.len();
    let mut out = SwingLevels::with_len(n);

    for i in 0..n {
        let span = since[i] + 1;
        let start = i.saturating_sub(span);
        out.price[0][i] = window_extreme(close, start, i, side);
        out.dif[0][i] = window_extreme(dif, start, i, side);

        let Some(prior) = i.checked_sub(span) else {
            continue;
        };
        if crosses[i] >= 2 {
            out.price[1][i] = out.price[0][prior];
            out.dif[1][i] = out.dif[0][prior];
        }
        if crosses[i] >= 3 {
            out.price[2][i] = out.price[1][prior];
            out.dif[2][i] = out.dif[1][prior];
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols_with(close: Vec<f64>, golden_at: &[usize]) -> (Vec<f64>, MacdColumns) {
        // Drive the swing logic directly with synthetic cross positions.
        let mut macd = MacdColumns::compute(&close);
        let golden: Vec<bool> = (0..close.len()).map(|i| golden_at.contains(&i)).collect();
        macd.m1 = crate::indicators::crossover::bars_since(&golden);
        macd.golden_count = crate::indicators::crossover::event_count(&golden);
        macd.dif = close.clone();
        (close, macd)
    }

    #[test]
    fn level_one_spans_since_day_before_cross() {
        let close = vec![5.0, 9.0, 1.0, 2.0, 3.0, 4.0];
        let (close, macd) = cols_with(close, &[2]);
        let s = SwingColumns::compute(&close, &macd);
        // i = 5, M1 = 3 -> window [1, 5]
        assert_eq!(s.highs.price[0][5], 9.0);
        // i = 2, M1 = 0 -> window [1, 2]
        assert_eq!(s.highs.price[0][2], 9.0);
        // Only one golden cross: no prior swing.
        assert!(s.highs.price[1].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn prior_levels_need_enough_crosses() {
        let close = vec![1.0, 2.0, 3.0, 8.0, 4.0, 5.0, 6.0, 7.0, 2.0, 3.0, 4.0];
        let (close, macd) = cols_with(close, &[2, 5, 8]);
        let s = SwingColumns::compute(&close, &macd);
        // i = 6: M1 = 1, two crosses, prior row 4 -> CH1[4] (M1 = 2, window [1, 4]) = 8
        assert_eq!(s.highs.price[1][6], 8.0);
        assert_eq!(s.highs.price[2][6], 0.0);
        // i = 10: M1 = 2, three crosses, prior row 7 -> CH2[7]
        assert_eq!(s.highs.price[2][10], s.highs.price[1][7]);
        assert!(s.highs.price[2][10] > 0.0);
        // DIF was set equal to close in the fixture.
        assert_eq!(s.highs.dif[1][6], 8.0);
    }

    #[test]
    fn lows_mirror_with_minima() {
        let close: Vec<f64> = (0..40).map(|i| 10.0 + (i as f64 * 0.5).sin()).collect();
        let macd = MacdColumns::compute(&close);
        let s = SwingColumns::compute(&close, &macd);
        for i in 0..close.len() {
            assert!(s.lows.price[0][i] <= close[i]);
            assert!(s.highs.price[0][i] >= close[i]);
        }
    }
}
