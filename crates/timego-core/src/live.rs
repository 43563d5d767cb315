//! Live/ambient presentation lifecycle.
//!
//! Manages the single always-visible presentation mirroring the countdown
//! (the lock-screen/ambient analogue). The platform seam is the
//! [`ActivitySurface`] trait; the manager owns at most one tracked handle and
//! enforces the identity-based cleanup rule: on start, the new presentation
//! is created first and only then are non-matching leftovers torn down, so
//! the user never sees a gap. Every operation degrades to a no-op on
//! failure; nothing here propagates errors to the caller.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::CountdownMode;
use crate::storage::SharedDb;

const ACTIVITIES_KEY: &str = "live_activities";

/// Opaque identity of one presentation instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityId(pub String);

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The payload a presentation renders from. Locale and theme are read by the
/// surface at render time and deliberately not part of this payload, which
/// is why [`LiveActivityManager::refresh`] exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityContent {
    pub mode: CountdownMode,
    pub target_instant: DateTime<Utc>,
    pub title: String,
    pub icon: String,
    pub started_at: DateTime<Utc>,
    pub total_duration_secs: i64,
    pub is_done: bool,
}

/// How an ended presentation leaves the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dismissal {
    /// Remove right away (cancel, stale cleanup).
    Immediate,
    /// Platform default: the done variant may linger until the user
    /// dismisses it.
    Default,
}

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("live activities are not permitted")]
    NotPermitted,
    #[error("no such activity: {0}")]
    UnknownActivity(String),
    #[error("surface storage failed: {0}")]
    Storage(String),
}

/// Platform seam for ambient presentations.
pub trait ActivitySurface {
    /// Capability check consulted before any creation attempt.
    fn activities_enabled(&self) -> bool;

    /// Create a presentation and return its identity.
    fn request(&mut self, content: &ActivityContent) -> Result<ActivityId, SurfaceError>;

    /// Replace the content of an existing presentation.
    fn update(&mut self, id: &ActivityId, content: &ActivityContent) -> Result<(), SurfaceError>;

    /// End a presentation with the given dismissal policy.
    fn end(&mut self, id: &ActivityId, dismissal: Dismissal) -> Result<(), SurfaceError>;

    /// Identities of every presentation currently registered, tracked or not.
    fn active(&self) -> Vec<ActivityId>;
}

/// Owns the single tracked presentation and its last-pushed content.
pub struct LiveActivityManager<A: ActivitySurface> {
    surface: A,
    current: Option<(ActivityId, ActivityContent)>,
}

impl<A: ActivitySurface> LiveActivityManager<A> {
    pub fn new(surface: A) -> Self {
        Self {
            surface,
            current: None,
        }
    }

    pub fn surface(&self) -> &A {
        &self.surface
    }

    pub fn current_id(&self) -> Option<&ActivityId> {
        self.current.as_ref().map(|(id, _)| id)
    }

    /// Create the presentation for a freshly started countdown.
    ///
    /// No-op when the platform forbids presentations or the target has
    /// already passed. On success exactly one presentation is tracked;
    /// pre-existing presentations with a different identity are torn down
    /// afterwards -- creation comes first so the user never sees a gap.
    pub fn start(
        &mut self,
        mode: CountdownMode,
        target: DateTime<Utc>,
        title: &str,
        icon: &str,
        now: DateTime<Utc>,
    ) {
        if !self.surface.activities_enabled() {
            tracing::debug!("live activities disabled, skipping presentation");
            return;
        }
        let duration_secs = (target - now).num_seconds();
        if duration_secs <= 0 {
            return;
        }

        let content = ActivityContent {
            mode,
            target_instant: target,
            title: title.to_string(),
            icon: icon.to_string(),
            started_at: now,
            total_duration_secs: duration_secs,
            is_done: false,
        };

        match self.surface.request(&content) {
            Ok(id) => {
                tracing::debug!(activity = %id, "live activity started");
                for stale in self.surface.active() {
                    if stale != id {
                        if let Err(e) = self.surface.end(&stale, Dismissal::Immediate) {
                            tracing::warn!(activity = %stale, error = %e, "stale activity cleanup failed");
                        }
                    }
                }
                self.current = Some((id, content));
            }
            Err(e) => tracing::warn!(error = %e, "live activity start failed"),
        }
    }

    /// Mutate the tracked presentation in place. No-op when none is tracked.
    pub fn update(&mut self, target: DateTime<Utc>, title: &str) {
        let Some((id, old)) = self.current.as_mut() else {
            return;
        };
        let content = ActivityContent {
            target_instant: target,
            title: title.to_string(),
            total_duration_secs: (target - old.started_at).num_seconds(),
            is_done: false,
            ..old.clone()
        };
        match self.surface.update(id, &content) {
            Ok(()) => *old = content,
            Err(e) => tracing::warn!(error = %e, "live activity update failed"),
        }
    }

    /// Natural zero: push the terminal done variant, end with the platform
    /// default dismissal (it may stay visible), and release tracking.
    pub fn finish(&mut self) {
        let Some((id, old)) = self.current.take() else {
            return;
        };
        let done = ActivityContent {
            is_done: true,
            ..old
        };
        if let Err(e) = self.surface.update(&id, &done) {
            tracing::warn!(error = %e, "live activity done update failed");
        }
        if let Err(e) = self.surface.end(&id, Dismissal::Default) {
            tracing::warn!(error = %e, "live activity finish failed");
        }
        tracing::debug!(activity = %id, "live activity finished");
    }

    /// Force-teardown of every presentation, tracked or not (explicit
    /// cancel).
    pub fn stop(&mut self) {
        for id in self.surface.active() {
            if let Err(e) = self.surface.end(&id, Dismissal::Immediate) {
                tracing::warn!(activity = %id, error = %e, "live activity stop failed");
            }
        }
        self.current = None;
    }

    /// Re-push the tracked content unchanged so dependent surfaces re-read
    /// external configuration (locale, theme) the payload doesn't encode.
    pub fn refresh(&mut self) {
        let Some((id, content)) = self.current.as_ref() else {
            return;
        };
        if let Err(e) = self.surface.update(id, content) {
            tracing::warn!(error = %e, "live activity refresh failed");
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredActivity {
    id: ActivityId,
    content: ActivityContent,
}

/// Production surface: the activity list lives in the shared database so the
/// widget process can render the ambient presentation. An activity ended
/// with the default dismissal stays registered (still visible) until a later
/// start or stop sweeps it away.
pub struct StoreSurface {
    db: Arc<SharedDb>,
    enabled: bool,
}

impl StoreSurface {
    pub fn new(db: Arc<SharedDb>, enabled: bool) -> Self {
        Self { db, enabled }
    }

    fn read_all(&self) -> Result<Vec<StoredActivity>, SurfaceError> {
        match self.db.kv_get(ACTIVITIES_KEY) {
            Ok(Some(json)) => serde_json::from_str(&json)
                .map_err(|e| SurfaceError::Storage(e.to_string())),
            Ok(None) => Ok(Vec::new()),
            Err(e) => Err(SurfaceError::Storage(e.to_string())),
        }
    }

    fn write_all(&self, activities: &[StoredActivity]) -> Result<(), SurfaceError> {
        let json =
            serde_json::to_string(activities).map_err(|e| SurfaceError::Storage(e.to_string()))?;
        self.db
            .kv_set(ACTIVITIES_KEY, &json)
            .map_err(|e| SurfaceError::Storage(e.to_string()))
    }

    /// Presentations currently registered, newest last (for widget render).
    pub fn visible(&self) -> Vec<ActivityContent> {
        self.read_all()
            .map(|all| all.into_iter().map(|a| a.content).collect())
            .unwrap_or_default()
    }
}

impl ActivitySurface for StoreSurface {
    fn activities_enabled(&self) -> bool {
        self.enabled
    }

    fn request(&mut self, content: &ActivityContent) -> Result<ActivityId, SurfaceError> {
        if !self.enabled {
            return Err(SurfaceError::NotPermitted);
        }
        let mut all = self.read_all()?;
        let id = ActivityId(uuid::Uuid::new_v4().to_string());
        all.push(StoredActivity {
            id: id.clone(),
            content: content.clone(),
        });
        self.write_all(&all)?;
        Ok(id)
    }

    fn update(&mut self, id: &ActivityId, content: &ActivityContent) -> Result<(), SurfaceError> {
        let mut all = self.read_all()?;
        let Some(entry) = all.iter_mut().find(|a| &a.id == id) else {
            return Err(SurfaceError::UnknownActivity(id.to_string()));
        };
        entry.content = content.clone();
        self.write_all(&all)
    }

    fn end(&mut self, id: &ActivityId, dismissal: Dismissal) -> Result<(), SurfaceError> {
        let mut all = self.read_all()?;
        match dismissal {
            Dismissal::Immediate => all.retain(|a| &a.id != id),
            // Default dismissal leaves the done variant on screen.
            Dismissal::Default => {}
        }
        self.write_all(&all)
    }

    fn active(&self) -> Vec<ActivityId> {
        self.read_all()
            .map(|all| all.into_iter().map(|a| a.id).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum SurfaceCall {
        Request(ActivityContent),
        Update(ActivityId, ActivityContent),
        End(ActivityId, Dismissal),
    }

    /// In-memory surface recording every call.
    pub struct RecordingSurface {
        pub enabled: bool,
        pub activities: Vec<StoredActivityEntry>,
        pub calls: Vec<SurfaceCall>,
        next_id: u32,
    }

    #[derive(Debug, Clone)]
    pub struct StoredActivityEntry {
        pub id: ActivityId,
        pub content: ActivityContent,
    }

    impl RecordingSurface {
        pub fn new(enabled: bool) -> Self {
            Self {
                enabled,
                activities: Vec::new(),
                calls: Vec::new(),
                next_id: 0,
            }
        }

        /// Seed a pre-existing activity, as left behind by a crashed process.
        pub fn seed(&mut self, content: ActivityContent) -> ActivityId {
            self.next_id += 1;
            let id = ActivityId(format!("seeded-{}", self.next_id));
            self.activities.push(StoredActivityEntry {
                id: id.clone(),
                content,
            });
            id
        }
    }

    impl ActivitySurface for RecordingSurface {
        fn activities_enabled(&self) -> bool {
            self.enabled
        }

        fn request(&mut self, content: &ActivityContent) -> Result<ActivityId, SurfaceError> {
            if !self.enabled {
                return Err(SurfaceError::NotPermitted);
            }
            self.calls.push(SurfaceCall::Request(content.clone()));
            self.next_id += 1;
            let id = ActivityId(format!("activity-{}", self.next_id));
            self.activities.push(StoredActivityEntry {
                id: id.clone(),
                content: content.clone(),
            });
            Ok(id)
        }

        fn update(&mut self, id: &ActivityId, content: &ActivityContent) -> Result<(), SurfaceError> {
            self.calls.push(SurfaceCall::Update(id.clone(), content.clone()));
            let Some(entry) = self.activities.iter_mut().find(|a| &a.id == id) else {
                return Err(SurfaceError::UnknownActivity(id.to_string()));
            };
            entry.content = content.clone();
            Ok(())
        }

        fn end(&mut self, id: &ActivityId, dismissal: Dismissal) -> Result<(), SurfaceError> {
            self.calls.push(SurfaceCall::End(id.clone(), dismissal));
            if dismissal == Dismissal::Immediate {
                self.activities.retain(|a| &a.id != id);
            }
            Ok(())
        }

        fn active(&self) -> Vec<ActivityId> {
            self.activities.iter().map(|a| a.id.clone()).collect()
        }
    }
}
