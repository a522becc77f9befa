// =============================================================================
// Top / Bottom Divergence and Structure Confirmation
// =============================================================================
//
// Direct top divergence at i (level 2):
//   CH1 > CH2                       price made a new swing high
//   MDIFT2 < MDIFH2                 but DIF sits below the prior DIF peak
//   MACD[i] > 0 && MACD[i-1] > 0    inside a positive-histogram regime
//   MDIFT2[i] >= MDIFT2[i-1]        DIF still not falling
//
// Skip-peak top divergence repeats the test against level 3 and additionally
// requires CH1 > CH3 > CH2. Bottom divergence mirrors both with minima, a
// negative histogram and a non-rising DIF.
//
// Confirmation (structure) at i: a raw divergence flagged at i-1 whose
// normalised DIF then moves adversely (lower for tops, higher for bottoms).
//
// A level whose prior swing is missing (CH2/CH3/CL2/CL3 == 0) never flags.
// =============================================================================

use serde::Serialize;

use crate::divergence::magnitude::NormalizedLevel;
use crate::indicators::macd::MacdColumns;
use crate::indicators::swing::SwingColumns;

/// DIF threshold under which a golden cross counts as "low".
pub const LOW_GOLDEN_CROSS_DIF: f64 = -0.1;
/// Trailing window for the second-golden-cross count.
pub const SECOND_CROSS_WINDOW: usize = 21;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedColumns {
    /// MDIFH2 / MDIFT2.
    pub top2: NormalizedLevel,
    /// MDIFH3 / MDIFT3.
    pub top3: NormalizedLevel,
    /// MDIFL2 / MDIFB2.
    pub bottom2: NormalizedLevel,
    /// MDIFL3 / MDIFB3.
    pub bottom3: NormalizedLevel,
}

impl NormalizedColumns {
    pub fn compute(macd: &MacdColumns, swings: &SwingColumns) -> Self {
        Self {
            top2: NormalizedLevel::compute(&swings.highs.dif[1], &macd.dif),
            top3: NormalizedLevel::compute(&swings.highs.dif[2], &macd.dif),
            bottom2: NormalizedLevel::compute(&swings.lows.dif[1], &macd.dif),
            bottom3: NormalizedLevel::compute(&swings.lows.dif[2], &macd.dif),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DivergenceColumns {
    pub direct_top: Vec<bool>,
    pub skip_top: Vec<bool>,
    pub direct_bottom: Vec<bool>,
    pub skip_bottom: Vec<bool>,
    /// Raw (unconfirmed) divergence: direct OR skip-peak.
    pub top_raw: Vec<bool>,
    pub bottom_raw: Vec<bool>,
    /// Confirmation of yesterday's raw divergence.
    pub top_confirmed: Vec<bool>,
    pub bottom_confirmed: Vec<bool>,
    /// DIF recovered to the prior peak/trough after a divergence day.
    pub top_vanished: Vec<bool>,
    pub bottom_vanished: Vec<bool>,
    pub macd_top_turn: Vec<bool>,
    pub macd_bottom_turn: Vec<bool>,
    pub low_golden_cross: Vec<bool>,
    pub second_golden_cross: Vec<bool>,
}

impl DivergenceColumns {
    pub fn compute(macd: &MacdColumns, swings: &SwingColumns, norm: &NormalizedColumns) -> Self {
        let n = macd.len();
        let (ch, cl) = (&swings.highs.price, &swings.lows.price);
        let (difh, difl) = (&swings.highs.dif, &swings.lows.dif);
        let m = &macd.macd;

        let positive = |i: usize| i > 0 && m[i] > 0.0 && m[i - 1] > 0.0;
        let negative = |i: usize| i > 0 && m[i] < 0.0 && m[i - 1] < 0.0;

        let direct_top: Vec<bool> = (0..n)
            .map(|i| {
                let t = &norm.top2;
                ch[1][i] > 0.0
                    && ch[0][i] > ch[1][i]
                    && t.current[i] < t.reference[i]
                    && positive(i)
                    && t.current[i] >= t.current[i - 1]
            })
            .collect();

        let skip_top: Vec<bool> = (0..n)
            .map(|i| {
                let t = &norm.top3;
                ch[2][i] > 0.0
                    && ch[0][i] > ch[2][i]
                    && ch[2][i] > ch[1][i]
                    && t.current[i] < t.reference[i]
                    && positive(i)
                    && t.current[i] >= t.current[i - 1]
            })
            .collect();

        let direct_bottom: Vec<bool> = (0..n)
            .map(|i| {
                let b = &norm.bottom2;
                cl[1][i] > 0.0
                    && cl[0][i] < cl[1][i]
                    && b.current[i] > b.reference[i]
                    && negative(i)
                    && b.current[i] <= b.current[i - 1]
            })
            .collect();

        let skip_bottom: Vec<bool> = (0..n)
            .map(|i| {
                let b = &norm.bottom3;
                cl[2][i] > 0.0
                    && cl[0][i] < cl[2][i]
                    && cl[2][i] < cl[1][i]
                    && b.current[i] > b.reference[i]
                    && negative(i)
                    && b.current[i] <= b.current[i - 1]
            })
            .collect();

        let top_confirmed: Vec<bool> = (0..n)
            .map(|i| {
                i > 0
                    && ((direct_top[i - 1] && norm.top2.current[i] < norm.top2.current[i - 1])
                        || (skip_top[i - 1] && norm.top3.current[i] < norm.top3.current[i - 1]))
            })
            .collect();

        let bottom_confirmed: Vec<bool> = (0..n)
            .map(|i| {
                i > 0
                    && ((direct_bottom[i - 1]
                        && norm.bottom2.current[i] > norm.bottom2.current[i - 1])
                        || (skip_bottom[i - 1]
                            && norm.bottom3.current[i] > norm.bottom3.current[i - 1]))
            })
            .collect();

        let top_vanished: Vec<bool> = (0..n)
            .map(|i| {
                i > 0
                    && ((direct_top[i - 1] && difh[0][i] >= difh[1][i])
                        || (skip_top[i - 1] && difh[0][i] >= difh[2][i]))
            })
            .collect();

        let bottom_vanished: Vec<bool> = (0..n)
            .map(|i| {
                i > 0
                    && ((direct_bottom[i - 1] && difl[0][i] <= difl[1][i])
                        || (skip_bottom[i - 1] && difl[0][i] <= difl[2][i]))
            })
            .collect();

        let macd_top_turn = (0..n)
            .map(|i| i >= 2 && m[i - 1] > m[i - 2] && m[i - 1] > m[i])
            .collect();
        let macd_bottom_turn = (0..n)
            .map(|i| i >= 2 && m[i - 2] > m[i - 1] && m[i] > m[i - 1])
            .collect();

        let low_golden_cross = (0..n)
            .map(|i| macd.golden_cross[i] && macd.dif[i] < LOW_GOLDEN_CROSS_DIF)
            .collect();
        let recent_golden =
            crate::indicators::crossover::rolling_count(&macd.golden_cross, SECOND_CROSS_WINDOW);
        let second_golden_cross = (0..n)
            .map(|i| macd.golden_cross[i] && macd.dea[i] < 0.0 && recent_golden[i] == Some(2))
            .collect();

        let top_raw = or(&direct_top, &skip_top);
        let bottom_raw = or(&direct_bottom, &skip_bottom);

        Self {
            direct_top,
            skip_top,
            direct_bottom,
            skip_bottom,
            top_raw,
            bottom_raw,
            top_confirmed,
            bottom_confirmed,
            top_vanished,
            bottom_vanished,
            macd_top_turn,
            macd_bottom_turn,
            low_golden_cross,
            second_golden_cross,
        }
    }
}

pub(crate) fn or(a: &[bool], b: &[bool]) -> Vec<bool> {
    a.iter().zip(b).map(|(&x, &y)| x || y).collect()
}

pub(crate) fn and3(a: &[bool], b: &[bool], c: &[bool]) -> Vec<bool> {
    a.iter()
        .zip(b)
        .zip(c)
        .map(|((&x, &y), &z)| x && y && z)
        .collect()
}
