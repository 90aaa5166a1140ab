//! Presentation-adapter boundary: refresh status summary and the
//! presenter contract.
//!
//! The pipeline hands the adapter a fresh record sequence plus this status
//! summary after every observable change; the adapter owns all drawing
//! (markers, heat layer, legend, error banner) and the pipeline assumes
//! nothing about how it draws.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::project::RenderRecord;

/// Coarse classification of a fetch failure, for banners and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FetchErrorKind {
    /// Transport failed or the server answered with a non-success status.
    Network,
    /// Response body was not well-formed JSON.
    Parse,
    /// Well-formed body with the wrong shape or inconsistent regions.
    UpstreamFormat,
    /// A tier label outside the five-member vocabulary.
    Classification,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parse => "parse",
            Self::UpstreamFormat => "upstream format",
            Self::Classification => "classification",
        }
    }
}

/// The most recent fetch failure, retained for the error banner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorInfo {
    pub kind: FetchErrorKind,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

/// Read-only refresh summary handed to the adapter next to the records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedStatus {
    /// Completion time of the last successful fetch.
    pub last_updated: Option<DateTime<Utc>>,
    pub last_error: Option<ErrorInfo>,
    pub is_fetching: bool,
    /// True once the current snapshot has outlived the configured TTL.
    pub is_stale: bool,
}

/// Drawing boundary.
///
/// `present` runs after every observable change: fetch started, snapshot
/// applied, fetch failed, filter changed. Implementations must not block;
/// they receive borrowed data and copy what they need.
pub trait Presenter: Send + Sync {
    fn present(&self, records: &[RenderRecord], status: &FeedStatus);
}
