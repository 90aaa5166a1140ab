//! Static coordinate anchors for the UK distribution regions.
//!
//! The upstream feed names regions but carries no geometry, so each
//! mappable region gets a fixed anchor point here. Pure and I/O-free;
//! `lookup` is the only operation. The aggregate rows the feed also
//! reports (England, Scotland, Wales, GB) have no single anchor and are
//! deliberately absent, which makes them exercise the coordinate-less
//! path with real data.

use serde::{Deserialize, Serialize};

/// A WGS84 map coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

/// Anchor points for the fourteen mappable distribution regions, keyed by
/// the upstream short name.
pub const REGION_ANCHORS: [(&str, Coordinate); 14] = [
    ("North Scotland", Coordinate { lat: 57.4778, lon: -4.2247 }),
    ("South Scotland", Coordinate { lat: 55.8642, lon: -4.2518 }),
    ("North West England", Coordinate { lat: 53.4808, lon: -2.2426 }),
    ("North East England", Coordinate { lat: 54.9783, lon: -1.6178 }),
    ("Yorkshire", Coordinate { lat: 53.7997, lon: -1.5492 }),
    ("North Wales & Merseyside", Coordinate { lat: 53.4084, lon: -2.9916 }),
    ("South Wales", Coordinate { lat: 51.4816, lon: -3.1791 }),
    ("West Midlands", Coordinate { lat: 52.4862, lon: -1.8904 }),
    ("East Midlands", Coordinate { lat: 52.9548, lon: -1.1581 }),
    ("East England", Coordinate { lat: 52.6309, lon: 1.2974 }),
    ("South West England", Coordinate { lat: 50.7184, lon: -3.5339 }),
    ("South England", Coordinate { lat: 50.9097, lon: -1.4044 }),
    ("London", Coordinate { lat: 51.5074, lon: -0.1278 }),
    ("South East England", Coordinate { lat: 51.2787, lon: 1.0789 }),
];

/// Look up the anchor for an upstream region short name.
///
/// Exact match on the upstream spelling. `None` for unknown names and for
/// the aggregate rows; absence is not an error.
pub fn lookup(short_name: &str) -> Option<Coordinate> {
    REGION_ANCHORS
        .iter()
        .find(|(name, _)| *name == short_name)
        .map(|(_, coordinate)| *coordinate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn known_anchor_exact_values() {
        let london = lookup("London").unwrap();
        assert_eq!(london.lat, 51.5074);
        assert_eq!(london.lon, -0.1278);

        let north_scotland = lookup("North Scotland").unwrap();
        assert_eq!(north_scotland.lat, 57.4778);
        assert_eq!(north_scotland.lon, -4.2247);
    }

    #[test]
    fn unknown_name_is_none() {
        assert!(lookup("Atlantis").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn aggregates_have_no_anchor() {
        for name in ["England", "Scotland", "Wales", "GB"] {
            assert!(lookup(name).is_none(), "{name} should not be mappable");
        }
    }

    #[test]
    fn lookup_is_exact_match() {
        assert!(lookup("london").is_none());
        assert!(lookup(" London").is_none());
        assert!(lookup("LONDON").is_none());
    }

    #[test]
    fn short_names_unique() {
        let names: HashSet<&str> = REGION_ANCHORS.iter().map(|(name, _)| *name).collect();
        assert_eq!(names.len(), REGION_ANCHORS.len());
    }

    #[test]
    fn anchors_within_uk_bounds() {
        for (name, coordinate) in REGION_ANCHORS {
            assert!(
                (49.0..=61.0).contains(&coordinate.lat),
                "{name} latitude {} outside the UK",
                coordinate.lat
            );
            assert!(
                (-8.2..=2.0).contains(&coordinate.lon),
                "{name} longitude {} outside the UK",
                coordinate.lon
            );
        }
    }
}
