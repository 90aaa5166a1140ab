//! Text legend presenter.
//!
//! Reference implementation of the drawing boundary: renders the projected
//! records and refresh status as structured log lines instead of map tiles.
//! Per-tier counts stand in for the marker layer, the staleness flag and
//! error line stand in for the banner affordances.

use tracing::{info, warn};

use carbonmap_core::color::tier_color;
use carbonmap_core::present::{FeedStatus, Presenter};
use carbonmap_core::project::RenderRecord;
use carbonmap_core::tier::IntensityTier;

pub struct LegendPresenter;

impl Presenter for LegendPresenter {
    fn present(&self, records: &[RenderRecord], status: &FeedStatus) {
        if status.is_fetching {
            info!("fetching latest regional data");
            return;
        }

        for tier in IntensityTier::ALL {
            let count = records.iter().filter(|r| r.tier == tier).count();
            if count > 0 {
                info!(
                    band = tier.display_name(),
                    color = tier_color(tier),
                    regions = count,
                    "legend"
                );
            }
        }

        if let Some(error) = &status.last_error {
            warn!(kind = error.kind.as_str(), "{}", error.message);
        }
        if let Some(updated) = status.last_updated {
            info!(
                updated = %updated,
                stale = status.is_stale,
                markers = records.len(),
                "map state"
            );
        }
    }
}
