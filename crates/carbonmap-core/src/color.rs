//! Canonical tier colors for markers and the legend.

use crate::tier::IntensityTier;

/// Map a tier to its display color.
///
/// Total over [`IntensityTier`] by exhaustive match, and injective: no two
/// tiers share a color. The very-low/low pair is the easy one to swap when
/// editing this table, so the tests pin every entry by value.
pub fn tier_color(tier: IntensityTier) -> &'static str {
    match tier {
        IntensityTier::VeryLow => "#2e7d32",
        IntensityTier::Low => "#7cb342",
        IntensityTier::Moderate => "#fdd835",
        IntensityTier::High => "#fb8c00",
        IntensityTier::VeryHigh => "#d32f2f",
    }
}
