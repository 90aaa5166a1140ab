//! Wire model for the regional endpoint and normalization into core types.
//!
//! The endpoint answers `{ "data": [ { "regions": [...] } ] }` and only the
//! first data window is consumed. Parsing is two-stage so the failure
//! taxonomy stays honest: a body that is not JSON at all is a parse error,
//! well-formed JSON with the wrong shape is an upstream-format error.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use carbonmap_core::registry;
use carbonmap_core::snapshot::{EXPECTED_FUELS, Region, Snapshot};
use carbonmap_core::tier::IntensityTier;

use crate::error::FeedError;

#[derive(Debug, Deserialize)]
struct WireBody {
    data: Vec<WireWindow>,
}

#[derive(Debug, Deserialize)]
struct WireWindow {
    regions: Vec<WireRegion>,
}

#[derive(Debug, Deserialize)]
struct WireRegion {
    shortname: String,
    intensity: WireIntensity,
    #[serde(default)]
    generationmix: Vec<WireMixEntry>,
}

#[derive(Debug, Deserialize)]
struct WireIntensity {
    forecast: f64,
    index: String,
}

#[derive(Debug, Deserialize)]
struct WireMixEntry {
    fuel: String,
    perc: f64,
}

/// Parse a response body and normalize it into a snapshot stamped
/// `fetched_at`.
pub fn parse_snapshot(body: &str, fetched_at: DateTime<Utc>) -> Result<Snapshot, FeedError> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    let wire: WireBody =
        serde_json::from_value(value).map_err(|e| FeedError::Shape(e.to_string()))?;
    let window = wire
        .data
        .into_iter()
        .next()
        .ok_or_else(|| FeedError::Shape("empty data array".into()))?;
    normalize(window.regions, fetched_at)
}

/// Normalize raw regions: classify the tier label, join the registry
/// anchor, and default every expected fuel absent from the payload to
/// zero percent. Duplicate short names are rejected; regions are unique
/// by short name within a snapshot.
fn normalize(raw: Vec<WireRegion>, fetched_at: DateTime<Utc>) -> Result<Snapshot, FeedError> {
    let mut seen = BTreeSet::new();
    let mut regions = Vec::with_capacity(raw.len());

    for entry in raw {
        if !seen.insert(entry.shortname.clone()) {
            return Err(FeedError::Shape(format!(
                "duplicate region shortname {:?}",
                entry.shortname
            )));
        }

        let tier = IntensityTier::from_index(&entry.intensity.index)?;

        let mut mix: BTreeMap<String, f64> = entry
            .generationmix
            .into_iter()
            .map(|m| (m.fuel, m.perc))
            .collect();
        for fuel in EXPECTED_FUELS {
            mix.entry(fuel.to_string()).or_insert(0.0);
        }

        let coordinate = registry::lookup(&entry.shortname);
        regions.push(Region {
            short_name: entry.shortname,
            coordinate,
            intensity_forecast: entry.intensity.forecast,
            intensity_tier: tier,
            generation_mix: mix,
        });
    }

    Ok(Snapshot {
        regions,
        fetched_at,
    })
}
