//! Local notification side channel.
//!
//! The core schedules and cancels at the same transition points it writes to
//! the store; delivery and rendering are delegated. Desktop toolkits cannot
//! schedule a toast for a future instant, so the production scheduler
//! persists one pending record and any surface that ticks or renders calls
//! `deliver_due` to fire it once the instant has passed. At most one
//! notification is pending at a time, matching the single-slot countdown.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bridge::RefreshBridge;
use crate::storage::SharedDb;

const PENDING_KEY: &str = "pending_notification";

/// External collaborator contract for local notifications.
pub trait NotificationScheduler {
    /// Schedule a notification for `at`, replacing any pending one.
    fn schedule(&self, at: DateTime<Utc>, title: &str, body: &str);

    /// Cancel whatever is pending. Idempotent.
    fn cancel_all(&self);

    /// Fire the pending notification if its instant has passed. Best-effort;
    /// called opportunistically from tick and read paths.
    fn deliver_due(&self, now: DateTime<Utc>);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PendingNotification {
    at: DateTime<Utc>,
    title: String,
    body: String,
}

/// Production scheduler: pending record in the shared database, delivery via
/// the desktop notification daemon.
pub struct DesktopScheduler {
    db: Arc<SharedDb>,
    bridge: Arc<dyn RefreshBridge>,
}

impl DesktopScheduler {
    pub fn new(db: Arc<SharedDb>, bridge: Arc<dyn RefreshBridge>) -> Self {
        Self { db, bridge }
    }

    fn pending(&self) -> Option<PendingNotification> {
        let json = self.db.kv_get(PENDING_KEY).ok().flatten()?;
        serde_json::from_str(&json).ok()
    }

    fn show(pending: &PendingNotification) {
        let result = notify_rust::Notification::new()
            .summary(&pending.title)
            .body(&pending.body)
            .show();
        if let Err(e) = result {
            tracing::warn!(error = %e, "notification delivery failed");
        }
    }
}

impl NotificationScheduler for DesktopScheduler {
    fn schedule(&self, at: DateTime<Utc>, title: &str, body: &str) {
        self.cancel_all();
        let pending = PendingNotification {
            at,
            title: title.to_string(),
            body: body.to_string(),
        };
        match serde_json::to_string(&pending) {
            Ok(json) => {
                if let Err(e) = self.db.kv_set(PENDING_KEY, &json) {
                    tracing::warn!(error = %e, "failed to persist pending notification");
                } else {
                    tracing::debug!(%at, title, "notification scheduled");
                    self.bridge.notify_state_changed();
                }
            }
            Err(e) => tracing::warn!(error = %e, "pending notification failed to serialize"),
        }
    }

    fn cancel_all(&self) {
        if let Err(e) = self.db.kv_delete(PENDING_KEY) {
            tracing::warn!(error = %e, "failed to cancel pending notification");
        }
        self.bridge.notify_state_changed();
    }

    fn deliver_due(&self, now: DateTime<Utc>) {
        let Some(pending) = self.pending() else {
            return;
        };
        if pending.at > now {
            return;
        }
        Self::show(&pending);
        if let Err(e) = self.db.kv_delete(PENDING_KEY) {
            tracing::warn!(error = %e, "failed to clear delivered notification");
        }
        self.bridge.notify_state_changed();
    }
}
