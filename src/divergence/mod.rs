// =============================================================================
// Divergence / Structure Detector
// =============================================================================
//
// Consumes the MACD and swing columns of an indicator frame and produces the
// per-day boolean signal columns:
// - Top passivation = raw OR confirmed top divergence
// - Bottom passivation = raw bottom divergence only
// - Confirmed divergence (structure)
// - Final divergence = passivation OR structure
// - Trend strength (strong zone, main rise)
// - Established top/bottom = passivation AND opposing cross AND structure
//
// Pure and allocation-only: safe to call from any worker concurrently.

pub mod magnitude;
pub mod structure;
pub mod trend;

use serde::Serialize;

use crate::indicators::macd::MacdColumns;
use crate::indicators::swing::SwingColumns;
use structure::{and3, or, DivergenceColumns, NormalizedColumns};
use trend::TrendColumns;

/// Final signal columns of a frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalColumns {
    pub normalized: NormalizedColumns,
    pub divergence: DivergenceColumns,
    pub trend: TrendColumns,
    pub top_passivation: Vec<bool>,
    pub bottom_passivation: Vec<bool>,
    pub top_structure: Vec<bool>,
    pub bottom_structure: Vec<bool>,
    pub top_divergence: Vec<bool>,
    pub bottom_divergence: Vec<bool>,
    pub top_established: Vec<bool>,
    pub bottom_established: Vec<bool>,
}

/// Run the detector over precomputed MACD and swing columns.
pub fn detect(macd: &MacdColumns, swings: &SwingColumns) -> SignalColumns {
    let normalized = NormalizedColumns::compute(macd, swings);
    let divergence = DivergenceColumns::compute(macd, swings, &normalized);
    let trend = TrendColumns::compute(&macd.macd);

    // A raw top needs a positive histogram while a death cross needs a
    // negative one, so top passivation also carries the confirmation day.
    let top_passivation = or(&divergence.top_raw, &divergence.top_confirmed);
    let bottom_passivation = divergence.bottom_raw.clone();
    let top_structure = divergence.top_confirmed.clone();
    let bottom_structure = divergence.bottom_confirmed.clone();
    let top_divergence = or(&top_passivation, &top_structure);
    let bottom_divergence = or(&bottom_passivation, &bottom_structure);
    let top_established = and3(&top_passivation, &macd.death_cross, &top_structure);
    let bottom_established = and3(&bottom_passivation, &macd.golden_cross, &bottom_structure);

    SignalColumns {
        normalized,
        divergence,
        trend,
        top_passivation,
        bottom_passivation,
        top_structure,
        bottom_structure,
        top_divergence,
        bottom_divergence,
        top_established,
        bottom_established,
    }
}
