// =============================================================================
// Order-of-Magnitude Normalisation
// =============================================================================
//
// DIF peaks from different price regimes are compared on a common scale:
//
//   exponent(x) = floor(log10(|x|)) - 1      (0 when x == 0)
//   mantissa(x, e) = trunc(x / 10^e)         (trunc(x) when e == 0)
//
// A reference peak fixes the exponent; today's DIF is scaled with the same
// exponent so both mantissas carry two significant digits of the reference.
// =============================================================================

use serde::Serialize;

/// Scaling exponent of `x`, see module docs.
pub fn exponent(x: f64) -> i32 {
    if x == 0.0 || !x.is_finite() {
        return 0;
    }
    x.abs().log10().floor() as i32 - 1
}

/// Truncated mantissa of `x` under exponent `e`.
pub fn mantissa(x: f64, e: i32) -> i64 {
    if !x.is_finite() {
        return 0;
    }
    if e == 0 {
        x.trunc() as i64
    } else {
        (x / 10f64.powi(e)).trunc() as i64
    }
}

/// Normalised pair: the reference peak's own mantissa and `value` scaled with
/// the reference's exponent.
pub fn normalize_against(reference: f64, value: f64) -> (i64, i64) {
    let e = exponent(reference);
    (mantissa(reference, e), mantissa(value, e))
}

/// Per-row normalised DIF comparators for one divergence level.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedLevel {
    /// Mantissa of the reference extremum (MDIFH2 / MDIFL2 ...).
    pub reference: Vec<i64>,
    /// Mantissa of today's DIF under the reference's exponent (MDIFT2 ...).
    pub current: Vec<i64>,
}

impl NormalizedLevel {
    pub fn compute(reference: &[f64], dif: &[f64]) -> Self {
        let (reference, current) = reference
            .iter()
            .zip(dif)
            .map(|(&r, &d)| normalize_against(r, d))
            .unzip();
        Self { reference, current }
    }
}
