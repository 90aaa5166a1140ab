pub mod color;
pub mod filter;
pub mod present;
pub mod project;
pub mod registry;
pub mod snapshot;
pub mod tier;

pub use color::tier_color;
pub use filter::TierFilter;
pub use present::{ErrorInfo, FeedStatus, FetchErrorKind, Presenter};
pub use project::{RegionMetrics, RenderRecord, project};
pub use registry::{Coordinate, lookup};
pub use snapshot::{EXPECTED_FUELS, Region, Snapshot, SnapshotSummary};
pub use tier::{ClassifyError, IntensityTier};
