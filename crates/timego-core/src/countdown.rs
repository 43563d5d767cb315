//! Countdown state machine and orchestration.
//!
//! The engine is wall-clock based: every operation takes `now` explicitly
//! and no transition trusts a deadline callback to have fired. Elapsing is
//! re-derived on every read path (`reconcile`) as well as on the foreground
//! tick, because the process that owns the live tick may have been suspended
//! when the target instant passed.
//!
//! ## State transitions
//!
//! ```text
//! Idle --start--> Running --elapse--> Finished --acknowledge--> Idle
//!                    |
//!                    +--cancel--> Idle
//! ```
//!
//! Starting while another countdown runs is rejected inside `start` -- the
//! one-at-a-time rule lives here, not at call sites.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::bridge::{RefreshBridge, WidgetRefreshBridge};
use crate::error::{CountdownError, Result};
use crate::events::Event;
use crate::live::{ActivitySurface, LiveActivityManager, StoreSurface};
use crate::notify::{DesktopScheduler, NotificationScheduler};
use crate::state::{CountdownMode, CountdownState};
use crate::storage::{Config, CountdownStore, SharedDb, SharedStore};

/// Notification body shown when a countdown reaches zero.
const FINISHED_BODY: &str = "Time is up.";

fn icon_for(mode: CountdownMode) -> &'static str {
    match mode {
        CountdownMode::Time2go => "timer",
        CountdownMode::Countdown => "hourglass",
    }
}

/// Core countdown engine.
///
/// Store, notification scheduler, and presentation surface are injected;
/// production wiring lives in [`CountdownEngine::open`], tests use the
/// in-memory fakes.
pub struct CountdownEngine<S, N, A>
where
    S: CountdownStore,
    N: NotificationScheduler,
    A: ActivitySurface,
{
    store: S,
    notifier: N,
    live: LiveActivityManager<A>,
}

/// Production engine wired to the shared database.
pub type DefaultEngine = CountdownEngine<SharedStore, DesktopScheduler, StoreSurface>;

impl DefaultEngine {
    /// Open the production engine: shared SQLite store, widget refresh
    /// bridge, desktop notifications, store-backed live activities.
    ///
    /// # Errors
    /// Returns an error if the shared database cannot be opened.
    pub fn open() -> Result<Self> {
        let db = Arc::new(SharedDb::open()?);
        let bridge: Arc<dyn RefreshBridge> = Arc::new(WidgetRefreshBridge::new(db.clone()));
        let config = Config::load_or_default();
        let store = SharedStore::new(db.clone(), bridge.clone());
        let notifier = DesktopScheduler::new(db.clone(), bridge);
        let surface = StoreSurface::new(db, config.live_activity.enabled);
        Ok(Self::new(store, notifier, LiveActivityManager::new(surface)))
    }
}

impl<S, N, A> CountdownEngine<S, N, A>
where
    S: CountdownStore,
    N: NotificationScheduler,
    A: ActivitySurface,
{
    pub fn new(store: S, notifier: N, live: LiveActivityManager<A>) -> Self {
        Self {
            store,
            notifier,
            live,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn live(&self) -> &LiveActivityManager<A> {
        &self.live
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a countdown toward `target`.
    ///
    /// Rejects with [`CountdownError::AlreadyRunning`] while another
    /// countdown runs; the store is left untouched in that case. On success
    /// the record is saved (which notifies widgets), a local notification is
    /// scheduled for the target instant, and the ambient presentation is
    /// created.
    pub fn start(
        &mut self,
        mode: CountdownMode,
        target: DateTime<Utc>,
        title: &str,
        now: DateTime<Utc>,
    ) -> std::result::Result<Event, CountdownError> {
        // Heal staleness first so an expired leftover doesn't block a new
        // countdown.
        let current = self.reconcile(now);
        if current.is_running {
            return Err(CountdownError::AlreadyRunning);
        }

        let state = CountdownState::running(mode, target, title);
        self.store.save(&state);
        self.notifier.schedule(target, title, FINISHED_BODY);
        self.live.start(mode, target, title, icon_for(mode), now);
        tracing::info!(%target, title, ?mode, "countdown started");

        Ok(Event::CountdownStarted {
            mode,
            target_instant: target,
            title: title.to_string(),
            at: now,
        })
    }

    /// Explicit cancel: clear the store, cancel notifications, tear down
    /// every ambient presentation. Immediate from the caller's perspective.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Event {
        self.store.clear();
        self.notifier.cancel_all();
        self.live.stop();
        tracing::info!("countdown cancelled");
        Event::CountdownCancelled { at: now }
    }

    /// Finished → Idle on user confirmation. The done presentation is left
    /// to the platform's dismissal policy; only the record and the pending
    /// notification are cleared.
    pub fn acknowledge(&mut self, now: DateTime<Utc>) -> Event {
        self.store.clear();
        self.notifier.cancel_all();
        tracing::info!("countdown acknowledged");
        Event::CountdownAcknowledged { at: now }
    }

    /// Foreground tick, called about once a second while a surface is
    /// visible. Drives the local elapse transition and due-notification
    /// delivery; returns the elapse event when the countdown just finished.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Event> {
        self.notifier.deliver_due(now);
        let state = self.store.load();
        if !state.needs_heal(now) {
            return None;
        }
        let healed = state.into_finished();
        self.store.save(&healed);
        self.live.finish();
        tracing::info!(title = %healed.title, "countdown elapsed");
        Some(Event::CountdownElapsed {
            mode: healed.mode,
            target_instant: healed.target_instant,
            title: healed.title,
            at: now,
        })
    }

    /// The re-entrant read rule: load the record and, if it claims Running
    /// with an already-past target, perform the elapse transition (write
    /// back Finished, finish the presentation) before returning. Every
    /// surface calls this before deriving its display, which is how
    /// staleness heals without a central authority.
    pub fn reconcile(&mut self, now: DateTime<Utc>) -> CountdownState {
        self.notifier.deliver_due(now);
        let state = self.store.load();
        if !state.needs_heal(now) {
            return state;
        }
        let healed = state.into_finished();
        self.store.save(&healed);
        self.live.finish();
        tracing::debug!(title = %healed.title, "stale running record healed to finished");
        healed
    }

    /// Pure read: snapshot of the current record with the phase derived at
    /// `now`. Does not write anything back; callers wanting healing call
    /// [`reconcile`](Self::reconcile) first.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Event {
        let state = self.store.load();
        Event::StateSnapshot {
            phase: state.phase_at(now),
            mode: state.mode,
            remaining_secs: state.remaining_secs(now),
            target_instant: state.target_instant,
            is_running: state.is_running,
            is_finished: state.is_finished,
            title: state.title,
            at: now,
        }
    }

    /// Re-push the ambient presentation unchanged after an external
    /// configuration change (theme, language).
    pub fn refresh_presentation(&mut self) {
        self.live.refresh();
    }
}
