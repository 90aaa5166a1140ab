//! Carbon-intensity tier classification.
//!
//! The upstream feed reports each region's band as a free-text index label
//! ("very low" through "very high"). Classification is a closed mapping:
//! the five known labels parse into [`IntensityTier`], anything else is a
//! hard error rather than a silent default, so a corrupted or extended
//! upstream vocabulary surfaces at the fetch boundary instead of rendering
//! with a wrong color.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("unknown intensity index {0:?}")]
    UnknownIndex(String),
}

/// Carbon-intensity band, ordered from cleanest to dirtiest.
///
/// `Ord` follows severity: `VeryLow < Low < Moderate < High < VeryHigh`.
/// Serde uses the camelCase tokens the adapter layer speaks (`veryLow`,
/// `low`, `moderate`, `high`, `veryHigh`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntensityTier {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl IntensityTier {
    /// All tiers in ascending severity order.
    pub const ALL: [IntensityTier; 5] = [
        IntensityTier::VeryLow,
        IntensityTier::Low,
        IntensityTier::Moderate,
        IntensityTier::High,
        IntensityTier::VeryHigh,
    ];

    /// Parse an upstream index label.
    ///
    /// Case-insensitive, surrounding whitespace tolerated. Internal spacing
    /// must match the upstream form exactly ("very low", not "very  low").
    pub fn from_index(label: &str) -> Result<Self, ClassifyError> {
        match label.trim().to_ascii_lowercase().as_str() {
            "very low" => Ok(Self::VeryLow),
            "low" => Ok(Self::Low),
            "moderate" => Ok(Self::Moderate),
            "high" => Ok(Self::High),
            "very high" => Ok(Self::VeryHigh),
            _ => Err(ClassifyError::UnknownIndex(label.to_string())),
        }
    }

    /// Human-readable name for legends and filter captions.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::VeryLow => "Very Low",
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
            Self::VeryHigh => "Very High",
        }
    }
}

impl std::str::FromStr for IntensityTier {
    type Err = ClassifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_index(s)
    }
}
