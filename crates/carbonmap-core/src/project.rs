//! Pure projection of a snapshot into renderable map records.
//!
//! `project` is the only read path between snapshot data and the drawing
//! layer: it filters by tier, joins the canonical color, and derives the
//! heat weight. Deterministic by construction, so the adapter can redraw
//! from scratch on every call instead of diffing.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::color::tier_color;
use crate::filter::TierFilter;
use crate::registry::Coordinate;
use crate::snapshot::{Region, Snapshot};
use crate::tier::IntensityTier;

/// Divisor turning a gCO2/kWh forecast into a heat weight.
///
/// 200 g/kWh sits at the top of the upstream's high band, so the linear
/// ramp saturates around the readings that should render hottest. Linear
/// on purpose: chosen for visual monotonicity, not statistical fit.
pub const HEAT_WEIGHT_DIVISOR: f64 = 200.0;

/// Upper clamp for heat weights. Continuous heat layers take normalized
/// weights, so the output range is exactly `[0.0, HEAT_WEIGHT_MAX]`.
pub const HEAT_WEIGHT_MAX: f64 = 1.0;

/// Popup metrics for one rendered region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionMetrics {
    pub short_name: String,
    /// Forecast intensity in gCO2/kWh.
    pub forecast: f64,
    /// fuel → percentage, stable order.
    pub mix: BTreeMap<String, f64>,
}

/// One renderable map record: marker fields plus heat-layer weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderRecord {
    pub coordinate: Coordinate,
    pub tier: IntensityTier,
    pub color: &'static str,
    pub metrics: RegionMetrics,
    /// Normalized heat-layer weight in `[0.0, 1.0]`.
    pub heat_weight: f64,
}

/// Project a snapshot through a filter into renderable records.
///
/// Pure: identical `(snapshot, filter)` inputs always yield identical
/// records in the snapshot's region order. Regions without a registry
/// anchor are skipped whatever the filter (nothing to place), but they
/// still count in [`Snapshot::summary`].
pub fn project(snapshot: &Snapshot, filter: TierFilter) -> Vec<RenderRecord> {
    let records: Vec<RenderRecord> = snapshot
        .regions
        .iter()
        .filter(|region| filter.matches(region.intensity_tier))
        .filter_map(render_record)
        .collect();
    debug!(
        total = snapshot.regions.len(),
        rendered = records.len(),
        "projected snapshot"
    );
    records
}

/// Linear heat weight for a forecast, clamped to `[0.0, HEAT_WEIGHT_MAX]`.
pub fn heat_weight(forecast: f64) -> f64 {
    (forecast / HEAT_WEIGHT_DIVISOR).clamp(0.0, HEAT_WEIGHT_MAX)
}

fn render_record(region: &Region) -> Option<RenderRecord> {
    let coordinate = region.coordinate?;
    Some(RenderRecord {
        coordinate,
        tier: region.intensity_tier,
        color: tier_color(region.intensity_tier),
        metrics: RegionMetrics {
            short_name: region.short_name.clone(),
            forecast: region.intensity_forecast,
            mix: region.generation_mix.clone(),
        },
        heat_weight: heat_weight(region.intensity_forecast),
    })
}
