//! Pure refresh state machine.
//!
//! Owns snapshot freshness: which phase the feed is in, which snapshot is
//! current, and whether a completing fetch is still the newest one. Every
//! time-sensitive method takes `now` explicitly, so the machine is tested
//! without timers; the driver in [`crate::scheduler`] supplies real time
//! and real fetches.
//!
//! # Sequence guard
//!
//! Each fetch attempt gets a [`FetchTicket`] with a monotonically
//! increasing sequence number. Completions apply last-writer-wins by
//! completion order: a ticket at or below the last applied sequence is
//! discarded, so an old, slow fetch can never overwrite a newer snapshot.
//! The driver keeps at most one fetch in flight, which makes the guard a
//! second line of defense rather than the primary mechanism.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use carbonmap_core::present::{ErrorInfo, FeedStatus};
use carbonmap_core::snapshot::Snapshot;

/// Lifecycle phase of the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    /// No fetch attempted yet.
    Idle,
    /// A fetch is in flight.
    Fetching,
    /// A snapshot is current and within TTL.
    Ready,
    /// The snapshot outlived the TTL without a newer fetch.
    Stale,
    /// The most recent fetch failed; any prior snapshot is retained.
    Failed,
}

/// Sequence tag for one fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    seq: u64,
}

impl FetchTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Whether a completion was applied or discarded as superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Applied,
    Superseded,
}

/// Refresh state: phase, retained snapshot, last error, freshness.
#[derive(Debug, Clone)]
pub struct RefreshMachine {
    phase: RefreshPhase,
    snapshot: Option<Arc<Snapshot>>,
    last_updated: Option<DateTime<Utc>>,
    last_error: Option<ErrorInfo>,
    ttl: TimeDelta,
    last_started: u64,
    last_applied: u64,
}

impl RefreshMachine {
    /// A machine with no snapshot, considering data stale after `ttl`.
    pub fn new(ttl: TimeDelta) -> Self {
        Self {
            phase: RefreshPhase::Idle,
            snapshot: None,
            last_updated: None,
            last_error: None,
            ttl,
            last_started: 0,
            last_applied: 0,
        }
    }

    pub fn phase(&self) -> RefreshPhase {
        self.phase
    }

    /// The current snapshot, if any fetch has ever succeeded.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.clone()
    }

    /// Start a fetch attempt, entering `Fetching`.
    ///
    /// The ticket must be handed back to exactly one of
    /// [`Self::complete_success`] / [`Self::complete_failure`].
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.last_started += 1;
        self.phase = RefreshPhase::Fetching;
        FetchTicket {
            seq: self.last_started,
        }
    }

    /// Apply a successful fetch completed at `now`.
    ///
    /// Superseded tickets change nothing. An applied success stores the
    /// snapshot, stamps `last_updated`, clears `last_error`, and enters
    /// `Ready` once no newer fetch is outstanding.
    pub fn complete_success(
        &mut self,
        ticket: FetchTicket,
        snapshot: Arc<Snapshot>,
        now: DateTime<Utc>,
    ) -> CompletionOutcome {
        if ticket.seq <= self.last_applied {
            debug!(
                seq = ticket.seq,
                applied = self.last_applied,
                "discarding superseded fetch success"
            );
            return CompletionOutcome::Superseded;
        }
        self.last_applied = ticket.seq;
        self.snapshot = Some(snapshot);
        self.last_updated = Some(now);
        self.last_error = None;
        if ticket.seq == self.last_started {
            self.phase = RefreshPhase::Ready;
        }
        CompletionOutcome::Applied
    }

    /// Record a failed fetch.
    ///
    /// Superseded tickets change nothing. An applied failure records
    /// `last_error` and enters `Failed` once no newer fetch is
    /// outstanding; the previous snapshot and `last_updated` survive.
    pub fn complete_failure(&mut self, ticket: FetchTicket, error: ErrorInfo) -> CompletionOutcome {
        if ticket.seq <= self.last_applied {
            debug!(
                seq = ticket.seq,
                applied = self.last_applied,
                "discarding superseded fetch failure"
            );
            return CompletionOutcome::Superseded;
        }
        self.last_applied = ticket.seq;
        self.last_error = Some(error);
        if ticket.seq == self.last_started {
            self.phase = RefreshPhase::Failed;
        }
        CompletionOutcome::Applied
    }

    /// Observe the passage of time: `Ready` decays to `Stale` once the
    /// TTL elapses (the boundary instant itself counts as stale).
    pub fn note_time(&mut self, now: DateTime<Utc>) {
        if self.phase == RefreshPhase::Ready && self.is_past_ttl(now) {
            debug!("snapshot went stale");
            self.phase = RefreshPhase::Stale;
        }
    }

    /// Whether a scheduled tick should start a fetch at `now`.
    ///
    /// True in `Idle`, `Stale`, `Failed`, and in `Ready` once the TTL has
    /// elapsed; false while a fetch is in flight.
    pub fn is_refresh_due(&self, now: DateTime<Utc>) -> bool {
        match self.phase {
            RefreshPhase::Idle | RefreshPhase::Stale | RefreshPhase::Failed => true,
            RefreshPhase::Ready => self.is_past_ttl(now),
            RefreshPhase::Fetching => false,
        }
    }

    /// Adapter-facing summary; staleness is derived at `now` so reads
    /// between timer ticks stay accurate.
    pub fn status(&self, now: DateTime<Utc>) -> FeedStatus {
        FeedStatus {
            last_updated: self.last_updated,
            last_error: self.last_error.clone(),
            is_fetching: self.phase == RefreshPhase::Fetching,
            is_stale: match self.phase {
                RefreshPhase::Stale => true,
                _ => self.snapshot.is_some() && self.is_past_ttl(now),
            },
        }
    }

    fn is_past_ttl(&self, now: DateTime<Utc>) -> bool {
        match self.last_updated {
            Some(updated) => now.signed_duration_since(updated) >= self.ttl,
            None => false,
        }
    }
}
