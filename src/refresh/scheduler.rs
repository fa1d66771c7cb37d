//! Owns the published snapshot and decides when to refresh it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::{run_cycle, Snapshot};
use crate::config::Settings;
use crate::context::ServiceContext;

/// Publishes the snapshot of the latest completed refresh cycle.
///
/// Readers get an `Arc` to an immutable snapshot and never wait for a
/// running cycle. At most one cycle runs at a time.
pub struct RefreshScheduler {
    ctx: ServiceContext,
    settings: Settings,
    current: RwLock<Arc<Snapshot>>,
    refreshing: Mutex<()>,
    cancel: watch::Receiver<bool>,
    cycles: AtomicU64,
}

impl RefreshScheduler {
    /// Creates a scheduler publishing an empty placeholder snapshot.
    ///
    /// Sending `true` on the sender paired with `cancel` aborts the running
    /// cycle and stops [`RefreshScheduler::run`].
    #[must_use]
    pub fn new(ctx: ServiceContext, settings: Settings, cancel: watch::Receiver<bool>) -> Self {
        Self {
            ctx,
            settings,
            current: RwLock::new(Arc::new(Snapshot::default())),
            refreshing: Mutex::new(()),
            cancel,
            cycles: AtomicU64::new(0),
        }
    }

    /// Validated settings the scheduler runs with.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The last published snapshot, without triggering a refresh.
    #[must_use]
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().expect("snapshot lock poisoned"))
    }

    /// Number of cycles published so far.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Returns the published snapshot, refreshing it first if it is older
    /// than the configured interval.
    ///
    /// If another caller is already refreshing, the current snapshot is
    /// returned as is.
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        let current = self.current();
        if !current.is_stale(self.ctx.clock.now(), self.settings.interval) {
            return current;
        }
        let Ok(_guard) = self.refreshing.try_lock() else {
            debug!("refresh already running, serving previous snapshot");
            return current;
        };
        let current = self.current();
        if !current.is_stale(self.ctx.clock.now(), self.settings.interval) {
            return current;
        }
        self.publish_cycle().await.unwrap_or(current)
    }

    /// Runs a cycle now, waiting for a running one to finish first.
    ///
    /// Returns `None` if the cycle was cancelled; the previous snapshot stays
    /// published.
    pub async fn refresh(&self) -> Option<Arc<Snapshot>> {
        let _guard = self.refreshing.lock().await;
        self.publish_cycle().await
    }

    async fn publish_cycle(&self) -> Option<Arc<Snapshot>> {
        let snapshot = Arc::new(run_cycle(&self.ctx, &self.settings, &self.cancel).await?);
        *self.current.write().expect("snapshot lock poisoned") = Arc::clone(&snapshot);
        self.cycles.fetch_add(1, Ordering::SeqCst);
        Some(snapshot)
    }

    /// Refreshes every interval until cancelled, calling `on_cycle` with each
    /// published snapshot. The first cycle starts immediately; a cycle that
    /// overruns the interval delays the next tick instead of stacking ticks.
    pub async fn run<F>(self: Arc<Self>, mut on_cycle: F)
    where
        F: FnMut(&Snapshot) + Send,
    {
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cancel = self.cancel.clone();
        loop {
            if *cancel.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(snapshot) = self.refresh().await {
                        on_cycle(&snapshot);
                    }
                }
                changed = cancel.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!(cycles = self.cycles(), "refresh loop stopped");
    }
}
