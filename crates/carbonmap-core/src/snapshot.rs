//! Region and snapshot model, plus summary counts for tabular views.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::Coordinate;
use crate::tier::IntensityTier;

/// Fuel types every region's generation mix is expected to report.
///
/// Entries absent from a raw payload are defaulted to zero percent during
/// normalization so popup metrics always show the full breakdown.
pub const EXPECTED_FUELS: [&str; 9] = [
    "biomass", "coal", "imports", "gas", "nuclear", "other", "hydro", "solar", "wind",
];

/// One region's classified reading within a snapshot.
///
/// Unique by `short_name` within its snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub short_name: String,
    /// `None` when the registry carries no anchor (the aggregate rows).
    /// Such regions stay out of spatial rendering but count in summaries.
    pub coordinate: Option<Coordinate>,
    /// Forecast intensity in gCO2/kWh.
    pub intensity_forecast: f64,
    pub intensity_tier: IntensityTier,
    /// fuel → percentage of generation, in stable sorted order.
    pub generation_mix: BTreeMap<String, f64>,
}

/// One immutable, timestamped batch of regional readings.
///
/// A new fetch produces a wholly new value; nothing mutates a snapshot in
/// place. Consumers share it as `Arc<Snapshot>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub regions: Vec<Region>,
    pub fetched_at: DateTime<Utc>,
}

/// Summary counts over a snapshot.
///
/// Counts cover every region, anchored or not; only `placeable_regions`
/// distinguishes the ones a map can actually show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub total_regions: usize,
    /// Regions with a registry anchor.
    pub placeable_regions: usize,
    pub very_low: usize,
    pub low: usize,
    pub moderate: usize,
    pub high: usize,
    pub very_high: usize,
}

impl Snapshot {
    /// Summary counts for tabular and legend views.
    pub fn summary(&self) -> SnapshotSummary {
        let mut summary = SnapshotSummary {
            total_regions: self.regions.len(),
            placeable_regions: 0,
            very_low: 0,
            low: 0,
            moderate: 0,
            high: 0,
            very_high: 0,
        };
        for region in &self.regions {
            if region.coordinate.is_some() {
                summary.placeable_regions += 1;
            }
            match region.intensity_tier {
                IntensityTier::VeryLow => summary.very_low += 1,
                IntensityTier::Low => summary.low += 1,
                IntensityTier::Moderate => summary.moderate += 1,
                IntensityTier::High => summary.high += 1,
                IntensityTier::VeryHigh => summary.very_high += 1,
            }
        }
        summary
    }
}

impl SnapshotSummary {
    /// Count for one tier.
    pub fn tier_count(&self, tier: IntensityTier) -> usize {
        match tier {
            IntensityTier::VeryLow => self.very_low,
            IntensityTier::Low => self.low,
            IntensityTier::Moderate => self.moderate,
            IntensityTier::High => self.high,
            IntensityTier::VeryHigh => self.very_high,
        }
    }
}
