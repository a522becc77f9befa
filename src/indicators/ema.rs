// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// Formula:
//   multiplier = 2 / (span + 1)
//   EMA_0      = x_0
//   EMA_t      = EMA_{t-1} + multiplier * (x_t - EMA_{t-1})
//
// Seeded with the first value and no warm-up adjustment, so the output is
// aligned 1:1 with the input and row t depends only on x_0..=x_t.
// =============================================================================

/// Compute the EMA series for `values` with the given `span`.
///
/// Returns an empty `Vec` for empty input or `span == 0`.
pub fn calculate_ema(values: &[f64], span: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };
    if span == 0 {
        return Vec::new();
    }

    let multiplier = 2.0 / (span as f64 + 1.0);
    let mut result = Vec::with_capacity(values.len());
    let mut prev = first;
    result.push(prev);
    for &x in &values[1..] {
        prev += multiplier * (x - prev);
        result.push(prev);
    }
    result
}
