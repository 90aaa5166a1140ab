//! Fetch failure taxonomy for the upstream feed.

use chrono::{DateTime, Utc};
use thiserror::Error;

use carbonmap_core::present::{ErrorInfo, FetchErrorKind};
use carbonmap_core::tier::ClassifyError;

/// Why a snapshot fetch failed.
///
/// A failed fetch never mutates caller-visible state; callers decide
/// whether to keep showing a stale snapshot. An empty-but-well-formed
/// region list is a legitimate empty snapshot, not an error.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected payload shape: {0}")]
    Shape(String),
    #[error(transparent)]
    Tier(#[from] ClassifyError),
}

impl FeedError {
    /// Adapter-facing error kind.
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Http(_) | Self::Server { .. } => FetchErrorKind::Network,
            Self::Json(_) => FetchErrorKind::Parse,
            Self::Shape(_) => FetchErrorKind::UpstreamFormat,
            Self::Tier(_) => FetchErrorKind::Classification,
        }
    }

    /// Banner-ready record of this failure at `occurred_at`.
    pub fn info(&self, occurred_at: DateTime<Utc>) -> ErrorInfo {
        ErrorInfo {
            kind: self.kind(),
            message: self.to_string(),
            occurred_at,
        }
    }
}
