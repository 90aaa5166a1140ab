pub mod client;
pub mod error;
pub mod wire;

pub use client::{DEFAULT_ENDPOINT, SnapshotClient, SnapshotSource};
pub use error::FeedError;
pub use wire::parse_snapshot;
