//! HTTP client for the regional intensity endpoint.

use chrono::Utc;
use tracing::info;

use carbonmap_core::snapshot::Snapshot;

use crate::error::FeedError;
use crate::wire;

/// Production endpoint for the regional intensity feed.
pub const DEFAULT_ENDPOINT: &str = "https://api.carbonintensity.org.uk/regional";

/// Abstract "fetch a data snapshot" capability.
///
/// The refresh scheduler depends on this seam, never on HTTP directly.
/// [`SnapshotClient`] is the production implementation; tests supply
/// scripted fakes.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<Snapshot, FeedError>;
}

/// HTTP snapshot client for the regional endpoint.
pub struct SnapshotClient {
    client: reqwest::Client,
    endpoint: String,
}

impl SnapshotClient {
    /// Create a client for the given endpoint URL (trailing slash tolerated).
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for SnapshotClient {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT.to_string())
    }
}

#[async_trait::async_trait]
impl SnapshotSource for SnapshotClient {
    /// One GET against the endpoint, normalized into a snapshot stamped
    /// with the completion time.
    async fn fetch_snapshot(&self) -> Result<Snapshot, FeedError> {
        info!(url = %self.endpoint, "fetching regional snapshot");
        let resp = self.client.get(&self.endpoint).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FeedError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        let snapshot = wire::parse_snapshot(&body, Utc::now())?;
        info!(regions = snapshot.regions.len(), "snapshot fetched");
        Ok(snapshot)
    }
}
