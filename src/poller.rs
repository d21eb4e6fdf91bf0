//! Periodic snapshot refresh.
//!
//! The poller fetches one page of events per tick, derives the dashboard
//! series, and publishes the result on a `watch` channel. Fetches run as
//! their own tasks so a slow response never delays the tick loop, but only
//! one is in flight at a time: a tick that finds a fetch still running is
//! skipped. Each fetch is tagged with a sequence number and only results
//! newer than the last one applied are published, so a late response can't
//! overwrite fresher data.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::analysis::{DashboardData, DashboardParams};
use crate::client::{ApiError, EventSource};
use crate::model::{Event, EventsPage};
use crate::session::Session;

/// What the dashboard currently shows.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub events: Arc<Vec<Event>>,
    pub data: Arc<DashboardData>,
    pub fetched_at: Option<DateTime<Utc>>,
    /// Sequence number of the fetch this state came from; 0 before the first.
    pub sequence: u64,
    /// Message from the most recent fetch, if it failed. Data from the last
    /// successful fetch is kept alongside it.
    pub error: Option<String>,
    pub unauthorized: bool,
}

impl DashboardState {
    pub fn is_loaded(&self) -> bool {
        self.fetched_at.is_some()
    }
}

pub struct SnapshotPoller<S> {
    source: S,
    session: Session,
    params: DashboardParams,
    per_page: u32,
    interval: Duration,
    next_sequence: AtomicU64,
    in_flight: AtomicBool,
    tx: watch::Sender<DashboardState>,
}

/// A running poller. Dropping it does not stop the task; call [`stop`].
///
/// [`stop`]: PollerHandle::stop
pub struct PollerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "snapshot poller task ended abnormally");
        }
    }
}

impl<S: EventSource + 'static> SnapshotPoller<S> {
    pub fn new(
        source: S,
        session: Session,
        params: DashboardParams,
        per_page: u32,
        interval: Duration,
    ) -> Self {
        let (tx, _rx) = watch::channel(DashboardState::default());
        Self {
            source,
            session,
            params,
            per_page,
            interval,
            next_sequence: AtomicU64::new(0),
            in_flight: AtomicBool::new(false),
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.tx.subscribe()
    }

    /// Start polling in the background. The first fetch happens immediately.
    pub fn spawn(self: Arc<Self>) -> PollerHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(cancel.clone()));
        PollerHandle { cancel, task }
    }

    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs_f64(),
            per_page = self.per_page,
            "snapshot poller started"
        );
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    if self.in_flight.swap(true, Ordering::AcqRel) {
                        debug!("previous fetch still in flight, skipping tick");
                        continue;
                    }
                    let poller = self.clone();
                    let cancel = cancel.child_token();
                    tokio::spawn(async move {
                        tokio::select! {
                            _ = cancel.cancelled() => {}
                            _ = poller.refresh() => {}
                        }
                        poller.in_flight.store(false, Ordering::Release);
                    });
                }
            }
        }
        info!("snapshot poller stopped");
    }

    /// Fetch once and publish the outcome if it is still the newest.
    pub async fn refresh(&self) -> bool {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let result = self.source.fetch_events(1, self.per_page).await;
        self.settle(sequence, result).await
    }

    /// Apply fetch `sequence`, clearing the session only when a 401 is the
    /// result that actually gets published.
    async fn settle(&self, sequence: u64, result: Result<EventsPage, ApiError>) -> bool {
        let unauthorized = matches!(result, Err(ApiError::Unauthorized));
        let published = self.apply(sequence, result);
        if published && unauthorized {
            self.session.clear().await;
        }
        published
    }

    /// Publish the result of fetch `sequence`. Returns false when a newer
    /// fetch has already been applied and this one was discarded.
    pub fn apply(&self, sequence: u64, result: Result<EventsPage, ApiError>) -> bool {
        // Derive outside the channel lock; stale results are rare enough that
        // the wasted work doesn't matter.
        let derived = result.map(|page| {
            let data = DashboardData::from_events(&page.events, self.params);
            (page.events, data)
        });

        self.tx.send_if_modified(|state| {
            if sequence <= state.sequence {
                debug!(sequence, current = state.sequence, "discarding stale snapshot");
                return false;
            }
            state.sequence = sequence;
            match derived {
                Ok((events, data)) => {
                    debug!(sequence, events = events.len(), "snapshot published");
                    state.events = Arc::new(events);
                    state.data = Arc::new(data);
                    state.fetched_at = Some(Utc::now());
                    state.error = None;
                    state.unauthorized = false;
                }
                Err(e) => {
                    warn!(sequence, error = %e, "snapshot fetch failed");
                    state.unauthorized = e.is_unauthorized();
                    state.error = Some(e.to_string());
                }
            }
            true
        })
    }
}
