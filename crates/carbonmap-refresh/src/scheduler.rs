//! Tokio driver around the pure refresh machine.
//!
//! One task owns the fetch loop ([`RefreshScheduler::run`]); the cloneable
//! [`FeedHandle`] is the adapter-facing surface (manual refresh, filter,
//! reads). Fetches are awaited inline, so at most one is in flight; manual
//! triggers arriving mid-fetch coalesce into it instead of queueing. After
//! every observable change the current snapshot is re-projected and handed
//! to the presenter.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::TimeDelta;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use carbonmap_core::filter::TierFilter;
use carbonmap_core::present::{FeedStatus, Presenter};
use carbonmap_core::project::{RenderRecord, project};
use carbonmap_core::snapshot::Snapshot;
use carbonmap_feed::client::SnapshotSource;

use crate::clock::{Clock, SystemClock};
use crate::state::{CompletionOutcome, RefreshMachine, RefreshPhase};

/// Freshness and timing knobs.
#[derive(Debug, Clone, Copy)]
pub struct RefreshConfig {
    /// Age after which a snapshot counts as stale.
    pub ttl: Duration,
    /// Period of the scheduled re-fetch timer.
    pub refresh_interval: Duration,
}

impl Default for RefreshConfig {
    /// Thirty minutes for both staleness and periodic re-fetch.
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            refresh_interval: Duration::from_secs(30 * 60),
        }
    }
}

struct Inner {
    machine: RefreshMachine,
    filter: TierFilter,
}

struct Shared {
    inner: Mutex<Inner>,
    clock: Box<dyn Clock>,
    presenter: Option<Box<dyn Presenter>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Machine methods keep the state valid across a panic elsewhere;
        // recover the guard instead of cascading.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Project the current snapshot through the current filter and hand
    /// the records to the presenter. The presenter runs outside the lock.
    fn present_current(&self) {
        let Some(presenter) = self.presenter.as_deref() else {
            return;
        };
        let now = self.clock.now();
        let (records, status) = {
            let inner = self.lock();
            let records = match inner.machine.snapshot() {
                Some(snapshot) => project(&snapshot, inner.filter),
                None => Vec::new(),
            };
            (records, inner.machine.status(now))
        };
        presenter.present(&records, &status);
    }
}

/// Why a fetch was started, for log lines.
#[derive(Debug, Clone, Copy)]
enum FetchReason {
    Startup,
    Scheduled,
    Manual,
}

impl FetchReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Scheduled => "scheduled",
            Self::Manual => "manual",
        }
    }
}

/// Background driver: owns the fetch loop and the snapshot source.
pub struct RefreshScheduler<S> {
    shared: Arc<Shared>,
    source: S,
    config: RefreshConfig,
    trigger_rx: mpsc::Receiver<()>,
}

/// Cloneable adapter-facing surface of the feed.
#[derive(Clone)]
pub struct FeedHandle {
    shared: Arc<Shared>,
    trigger_tx: mpsc::Sender<()>,
}

impl<S: SnapshotSource> RefreshScheduler<S> {
    /// Scheduler with the system clock and no presenter.
    pub fn new(source: S, config: RefreshConfig) -> (Self, FeedHandle) {
        Self::with_parts(source, config, Box::new(SystemClock), None)
    }

    /// Fully-parameterized constructor; tests inject manual clocks and
    /// recording presenters here.
    pub fn with_parts(
        source: S,
        config: RefreshConfig,
        clock: Box<dyn Clock>,
        presenter: Option<Box<dyn Presenter>>,
    ) -> (Self, FeedHandle) {
        // A TTL too large for chrono arithmetic means "never stale".
        let ttl = TimeDelta::from_std(config.ttl).unwrap_or(TimeDelta::MAX);
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                machine: RefreshMachine::new(ttl),
                filter: TierFilter::All,
            }),
            clock,
            presenter,
        });
        // Capacity 1: a pending manual trigger is already "refresh soon",
        // further requests collapse into it.
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let handle = FeedHandle {
            shared: Arc::clone(&shared),
            trigger_tx,
        };
        (
            Self {
                shared,
                source,
                config,
                trigger_rx,
            },
            handle,
        )
    }

    /// Drive the feed: startup fetch, then scheduled and manual refreshes.
    ///
    /// Returns once every [`FeedHandle`] clone has been dropped.
    pub async fn run(mut self) {
        self.fetch_once(FetchReason::Startup).await;

        // First tick lands one full interval after startup, so a failed
        // startup fetch is retried on the normal cadence, not hot-looped.
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.refresh_interval,
            self.config.refresh_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.scheduled_refresh_due() {
                        self.fetch_once(FetchReason::Scheduled).await;
                    }
                }
                msg = self.trigger_rx.recv() => match msg {
                    Some(()) => self.fetch_once(FetchReason::Manual).await,
                    None => {
                        debug!("all feed handles dropped, stopping refresh loop");
                        return;
                    }
                },
            }
        }
    }

    fn scheduled_refresh_due(&self) -> bool {
        let now = self.shared.clock.now();
        let mut inner = self.shared.lock();
        inner.machine.note_time(now);
        inner.machine.is_refresh_due(now)
    }

    async fn fetch_once(&mut self, reason: FetchReason) {
        let ticket = {
            let mut inner = self.shared.lock();
            inner.machine.begin_fetch()
        };
        info!(
            reason = reason.as_str(),
            seq = ticket.seq(),
            "starting snapshot fetch"
        );
        self.shared.present_current();

        let result = self.source.fetch_snapshot().await;
        let now = self.shared.clock.now();

        match result {
            Ok(snapshot) => {
                let regions = snapshot.regions.len();
                let outcome = {
                    let mut inner = self.shared.lock();
                    inner
                        .machine
                        .complete_success(ticket, Arc::new(snapshot), now)
                };
                match outcome {
                    CompletionOutcome::Applied => info!(regions, "snapshot applied"),
                    CompletionOutcome::Superseded => {
                        debug!(seq = ticket.seq(), "snapshot superseded before apply")
                    }
                }
            }
            Err(e) => {
                let error = e.info(now);
                warn!(kind = error.kind.as_str(), error = %e, "snapshot fetch failed");
                let mut inner = self.shared.lock();
                inner.machine.complete_failure(ticket, error);
            }
        }

        // Triggers that arrived while the fetch was in flight were
        // coalesced into it; drop them instead of fetching again.
        while self.trigger_rx.try_recv().is_ok() {}

        self.shared.present_current();
    }
}

impl FeedHandle {
    /// Ask for a refresh now.
    ///
    /// A no-op while a fetch is already in flight; that fetch serves the
    /// request. Requests are coalesced, never queued.
    pub fn request_refresh(&self) {
        {
            let inner = self.shared.lock();
            if inner.machine.phase() == RefreshPhase::Fetching {
                debug!("refresh requested while fetching, coalescing");
                return;
            }
        }
        if self.trigger_tx.try_send(()).is_err() {
            debug!("refresh already pending, coalescing");
        }
    }

    /// Change the tier filter and re-present the filtered records.
    /// Never triggers a fetch.
    pub fn set_filter(&self, filter: TierFilter) {
        {
            let mut inner = self.shared.lock();
            if inner.filter == filter {
                return;
            }
            inner.filter = filter;
        }
        info!(label = %filter.legend_label(), "filter changed");
        self.shared.present_current();
    }

    /// Current filter.
    pub fn filter(&self) -> TierFilter {
        self.shared.lock().filter
    }

    /// Refresh summary at this instant.
    pub fn status(&self) -> FeedStatus {
        let now = self.shared.clock.now();
        self.shared.lock().machine.status(now)
    }

    /// Latest snapshot, if any fetch has succeeded.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.shared.lock().machine.snapshot()
    }

    /// Renderable records for the current snapshot and filter.
    pub fn records(&self) -> Vec<RenderRecord> {
        let inner = self.shared.lock();
        match inner.machine.snapshot() {
            Some(snapshot) => project(&snapshot, inner.filter),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{DateTime, TimeZone, Utc};

    use carbonmap_core::present::FetchErrorKind;
    use carbonmap_core::registry::Coordinate;
    use carbonmap_core::snapshot::Region;
    use carbonmap_core::tier::IntensityTier;
    use carbonmap_feed::FeedError;

    fn anchored(short_name: &str, tier: IntensityTier) -> Region {
        Region {
            short_name: short_name.to_string(),
            coordinate: Some(Coordinate { lat: 51.5, lon: -0.1 }),
            intensity_forecast: 150.0,
            intensity_tier: tier,
            generation_mix: BTreeMap::new(),
        }
    }

    fn snap(regions: Vec<Region>) -> Snapshot {
        Snapshot {
            regions,
            fetched_at: Utc::now(),
        }
    }

    fn test_config() -> RefreshConfig {
        // Interval long enough that only manual triggers drive the tests.
        RefreshConfig {
            ttl: Duration::from_secs(3600),
            refresh_interval: Duration::from_secs(3600),
        }
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if cond() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        cond()
    }

    /// Pops one scripted response per call; errors once the script runs out.
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<Snapshot, FeedError>>>,
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<Snapshot, FeedError>>) -> Self {
            Self::with_delay(responses, Duration::ZERO)
        }

        fn with_delay(responses: Vec<Result<Snapshot, FeedError>>, delay: Duration) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Arc::new(AtomicUsize::new(0)),
                delay,
            }
        }

        fn calls(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.calls)
        }
    }

    #[async_trait::async_trait]
    impl SnapshotSource for ScriptedSource {
        async fn fetch_snapshot(&self) -> Result<Snapshot, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(FeedError::Shape("script exhausted".into())))
        }
    }

    /// Always succeeds with an empty snapshot.
    #[derive(Default)]
    struct EndlessSource {
        calls: Arc<AtomicUsize>,
    }

    impl EndlessSource {
        fn calls(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.calls)
        }
    }

    #[async_trait::async_trait]
    impl SnapshotSource for EndlessSource {
        async fn fetch_snapshot(&self) -> Result<Snapshot, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(snap(vec![]))
        }
    }

    /// Records `(record count, status)` per present call.
    #[derive(Default)]
    struct RecordingPresenter {
        seen: Arc<Mutex<Vec<(usize, FeedStatus)>>>,
    }

    impl RecordingPresenter {
        fn seen(&self) -> Arc<Mutex<Vec<(usize, FeedStatus)>>> {
            Arc::clone(&self.seen)
        }
    }

    impl Presenter for RecordingPresenter {
        fn present(&self, records: &[RenderRecord], status: &FeedStatus) {
            self.seen
                .lock()
                .unwrap()
                .push((records.len(), status.clone()));
        }
    }

    /// Manually advanced clock.
    #[derive(Clone)]
    struct TestClock(Arc<Mutex<DateTime<Utc>>>);

    impl TestClock {
        fn at(start: DateTime<Utc>) -> Self {
            Self(Arc::new(Mutex::new(start)))
        }

        fn advance_minutes(&self, minutes: i64) {
            let mut now = self.0.lock().unwrap();
            *now += TimeDelta::minutes(minutes);
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    #[tokio::test]
    async fn startup_fetch_populates_handle() {
        let source = ScriptedSource::new(vec![Ok(snap(vec![anchored(
            "London",
            IntensityTier::High,
        )]))]);
        let calls = source.calls();
        let (scheduler, handle) = RefreshScheduler::new(source, test_config());
        tokio::spawn(scheduler.run());

        assert!(wait_until(|| handle.snapshot().is_some()).await);
        let status = handle.status();
        assert!(status.last_updated.is_some());
        assert!(status.last_error.is_none());
        assert!(!status.is_fetching);
        assert_eq!(handle.records().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn manual_triggers_during_fetch_coalesce() {
        let source = ScriptedSource::with_delay(
            vec![Ok(snap(vec![])), Ok(snap(vec![]))],
            Duration::from_millis(200),
        );
        let calls = source.calls();
        let (scheduler, handle) = RefreshScheduler::new(source, test_config());
        tokio::spawn(scheduler.run());

        assert!(wait_until(|| handle.status().is_fetching).await);
        handle.request_refresh();
        handle.request_refresh();
        handle.request_refresh();

        assert!(wait_until(|| !handle.status().is_fetching).await);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1, "triggers must coalesce");

        // Once the feed has settled, a request does start a new fetch.
        handle.request_refresh();
        assert!(wait_until(|| calls.load(Ordering::SeqCst) == 2).await);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_prior_snapshot() {
        let first = snap(vec![anchored("London", IntensityTier::High)]);
        let stamp = first.fetched_at;
        let source = ScriptedSource::new(vec![
            Ok(first),
            Err(FeedError::Shape("empty data array".into())),
        ]);
        let (scheduler, handle) = RefreshScheduler::new(source, test_config());
        tokio::spawn(scheduler.run());

        assert!(wait_until(|| handle.snapshot().is_some()).await);
        handle.request_refresh();
        assert!(wait_until(|| handle.status().last_error.is_some()).await);

        let status = handle.status();
        assert_eq!(
            status.last_error.unwrap().kind,
            FetchErrorKind::UpstreamFormat
        );
        // Stale-but-valid data stays on display.
        assert_eq!(handle.snapshot().unwrap().fetched_at, stamp);
        assert_eq!(handle.records().len(), 1);
    }

    #[tokio::test]
    async fn filter_change_re_presents_filtered_records() {
        let source = ScriptedSource::new(vec![Ok(snap(vec![
            anchored("London", IntensityTier::High),
            anchored("South Wales", IntensityTier::Low),
        ]))]);
        let presenter = RecordingPresenter::default();
        let seen = presenter.seen();
        let (scheduler, handle) = RefreshScheduler::with_parts(
            source,
            test_config(),
            Box::new(SystemClock),
            Some(Box::new(presenter)),
        );
        tokio::spawn(scheduler.run());

        assert!(wait_until(|| handle.snapshot().is_some()).await);
        assert!(wait_until(|| seen.lock().unwrap().iter().any(|(n, _)| *n == 2)).await);

        handle.set_filter(TierFilter::Only(IntensityTier::Low));
        assert_eq!(handle.filter(), TierFilter::Only(IntensityTier::Low));
        assert_eq!(handle.records().len(), 1);
        assert_eq!(seen.lock().unwrap().last().map(|(n, _)| *n), Some(1));

        // Setting the same filter again presents nothing new.
        let count = seen.lock().unwrap().len();
        handle.set_filter(TierFilter::Only(IntensityTier::Low));
        assert_eq!(seen.lock().unwrap().len(), count);
    }

    #[tokio::test]
    async fn presenter_observes_fetch_start_and_completion() {
        let source = ScriptedSource::new(vec![Ok(snap(vec![anchored(
            "London",
            IntensityTier::Moderate,
        )]))]);
        let presenter = RecordingPresenter::default();
        let seen = presenter.seen();
        let (scheduler, handle) = RefreshScheduler::with_parts(
            source,
            test_config(),
            Box::new(SystemClock),
            Some(Box::new(presenter)),
        );
        tokio::spawn(scheduler.run());

        assert!(wait_until(|| seen.lock().unwrap().len() >= 2).await);
        let entries = seen.lock().unwrap().clone();
        assert!(entries[0].1.is_fetching, "first present is the fetch start");
        assert_eq!(entries[0].0, 0, "nothing to draw before the first success");
        let last = entries.last().unwrap();
        assert!(!last.1.is_fetching);
        assert_eq!(last.0, 1);
        drop(handle);
    }

    #[tokio::test]
    async fn staleness_follows_injected_clock() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let clock = TestClock::at(t0);
        let source = ScriptedSource::new(vec![Ok(snap(vec![]))]);
        let config = RefreshConfig {
            ttl: Duration::from_secs(30 * 60),
            refresh_interval: Duration::from_secs(3600),
        };
        let (scheduler, handle) =
            RefreshScheduler::with_parts(source, config, Box::new(clock.clone()), None);
        tokio::spawn(scheduler.run());

        assert!(wait_until(|| handle.status().last_updated.is_some()).await);
        assert!(!handle.status().is_stale);

        clock.advance_minutes(31);
        assert!(handle.status().is_stale);
    }

    #[tokio::test]
    async fn scheduled_ticks_refetch_once_stale() {
        let source = EndlessSource::default();
        let calls = source.calls();
        let config = RefreshConfig {
            ttl: Duration::from_millis(50),
            refresh_interval: Duration::from_millis(100),
        };
        let (scheduler, handle) = RefreshScheduler::new(source, config);
        tokio::spawn(scheduler.run());

        // Startup fetch plus at least two timer-driven refreshes.
        assert!(wait_until(|| calls.load(Ordering::SeqCst) >= 3).await);
        drop(handle);
    }

    #[tokio::test]
    async fn fresh_snapshot_skips_scheduled_ticks() {
        let source = EndlessSource::default();
        let calls = source.calls();
        let config = RefreshConfig {
            ttl: Duration::from_secs(3600),
            refresh_interval: Duration::from_millis(50),
        };
        let (scheduler, handle) = RefreshScheduler::new(source, config);
        tokio::spawn(scheduler.run());

        assert!(wait_until(|| calls.load(Ordering::SeqCst) >= 1).await);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(
            calls.load(Ordering::SeqCst),
            1,
            "ticks must not refetch while the snapshot is fresh"
        );
        drop(handle);
    }

    #[tokio::test]
    async fn run_stops_when_all_handles_drop() {
        let source = EndlessSource::default();
        let (scheduler, handle) = RefreshScheduler::new(source, test_config());
        let worker = tokio::spawn(scheduler.run());

        assert!(wait_until(|| handle.snapshot().is_some()).await);
        drop(handle);
        let done = tokio::time::timeout(Duration::from_secs(2), worker).await;
        assert!(done.is_ok(), "loop must stop once every handle is gone");
    }
}
