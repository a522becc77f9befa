// =============================================================================
// MACD Family - DIF / DEA / histogram and cross bookkeeping
// =============================================================================
//
//   DIF  = (EMA(close, 12) - EMA(close, 26)) * 100
//   DEA  = EMA(DIF, 9)
//   MACD = 2 * (DIF - DEA)
//
// Golden cross = DIF crossing above DEA, death cross = DEA crossing above DIF.
// M1..M3 are the distances back to the 1st/2nd/3rd most recent golden cross,
// N1..N3 the same for death crosses. A level with too few crosses reads 0.
// =============================================================================

use serde::Serialize;

use crate::indicators::crossover::{bars_since, bars_since_nth, cross, event_count};
use crate::indicators::ema::calculate_ema;

pub const FAST_SPAN: usize = 12;
pub const SLOW_SPAN: usize = 26;
pub const SIGNAL_SPAN: usize = 9;

/// MACD-derived columns, each aligned with the close series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacdColumns {
    pub dif: Vec<f64>,
    pub dea: Vec<f64>,
    pub macd: Vec<f64>,
    pub golden_cross: Vec<bool>,
    pub death_cross: Vec<bool>,
    /// Golden crosses seen at or before each row.
    pub golden_count: Vec<usize>,
    /// Death crosses seen at or before each row.
    pub death_count: Vec<usize>,
    pub m1: Vec<usize>,
    pub m2: Vec<usize>,
    pub m3: Vec<usize>,
    pub n1: Vec<usize>,
    pub n2: Vec<usize>,
    pub n3: Vec<usize>,
}

impl MacdColumns {
    pub fn compute(close: &[f64]) -> Self {
        let fast = calculate_ema(close, FAST_SPAN);
        let slow = calculate_ema(close, SLOW_SPAN);
        let dif: Vec<f64> = fast
            .iter()
            .zip(&slow)
            .map(|(f, s)| (f - s) * 100.0)
            .collect();
        let dea = calculate_ema(&dif, SIGNAL_SPAN);
        let macd: Vec<f64> = dif.iter().zip(&dea).map(|(a, b)| 2.0 * (a - b)).collect();

        let golden_cross = cross(&dif, &dea);
        let death_cross = cross(&dea, &dif);

        Self {
            golden_count: event_count(&golden_cross),
            death_count: event_count(&death_cross),
            m1: bars_since(&golden_cross),
            m2: bars_since_nth(&golden_cross, 2),
            m3: bars_since_nth(&golden_cross, 3),
            n1: bars_since(&death_cross),
            n2: bars_since_nth(&death_cross, 2),
            n3: bars_since_nth(&death_cross, 3),
            dif,
            dea,
            macd,
            golden_cross,
            death_cross,
        }
    }

    pub fn len(&self) -> usize {
        self.dif.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_series_has_zero_macd_and_no_crosses() {
        let cols = MacdColumns::compute(&[10.0; 50]);
        assert!(cols.dif.iter().all(|v| v.abs() < 1e-12));
        assert!(cols.macd.iter().all(|v| v.abs() < 1e-12));
        assert!(!cols.golden_cross.iter().any(|&c| c));
        assert!(!cols.death_cross.iter().any(|&c| c));
        assert!(cols.m1.iter().all(|&m| m == 0));
    }

    #[test]
    fn rising_series_golden_crosses_on_second_day() {
        let close: Vec<f64> = (0..40).map(|i| 10.0 + 0.1 * i as f64).collect();
        let cols = MacdColumns::compute(&close);
        assert!(cols.golden_cross[1]);
        assert_eq!(cols.golden_count[39], 1);
        assert_eq!(cols.m1[39], 38);
        assert!(cols.dif.windows(2).skip(1).all(|w| w[1] > w[0]));
        assert!(cols.macd[1..].iter().all(|&m| m > 0.0));
        assert!(cols.m2.iter().all(|&m| m == 0));
    }

    #[test]
    fn macd_is_twice_dif_minus_dea() {
        let close: Vec<f64> = (0..60).map(|i| 20.0 + (i as f64 * 0.3).sin()).collect();
        let cols = MacdColumns::compute(&close);
        for i in 0..close.len() {
            assert!((cols.macd[i] - 2.0 * (cols.dif[i] - cols.dea[i])).abs() < 1e-9);
        }
    }
}
