mod legend;

use carbonmap_feed::client::{DEFAULT_ENDPOINT, SnapshotClient};
use carbonmap_refresh::clock::SystemClock;
use carbonmap_refresh::scheduler::{RefreshConfig, RefreshScheduler};

use crate::legend::LegendPresenter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("carbonmap v{}", env!("CARGO_PKG_VERSION"));

    let endpoint =
        std::env::var("CARBONMAP_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
    tracing::info!(endpoint = %endpoint, "using regional feed");

    let source = SnapshotClient::new(endpoint);
    let (scheduler, handle) = RefreshScheduler::with_parts(
        source,
        RefreshConfig::default(),
        Box::new(SystemClock),
        Some(Box::new(LegendPresenter)),
    );
    let worker = tokio::spawn(scheduler.run());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    drop(handle);
    let _ = worker.await;
    Ok(())
}
