//! Tier filter state and legend captions.

use crate::tier::IntensityTier;

/// Which regions the adapter should currently show.
///
/// Independent of the snapshot lifecycle: changing the filter never
/// triggers a fetch, it only re-projects the snapshot already held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TierFilter {
    /// Every region.
    #[default]
    All,
    /// Only regions classified exactly this tier.
    Only(IntensityTier),
}

impl TierFilter {
    /// Whether a region in `tier` passes this filter.
    pub fn matches(&self, tier: IntensityTier) -> bool {
        match self {
            Self::All => true,
            Self::Only(only) => *only == tier,
        }
    }

    /// Legend caption for the current filter.
    pub fn legend_label(&self) -> String {
        match self {
            Self::All => "Showing: All Regions".to_string(),
            Self::Only(tier) => format!("Showing: {} Intensity Regions", tier.display_name()),
        }
    }
}
