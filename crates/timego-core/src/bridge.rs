//! State notification bridge.
//!
//! A save to the shared store asks every registered widget surface to
//! re-render. The ask is fire-and-forget: no acknowledgement, no delivery
//! guarantee, idempotent and cheap enough to call several times per user
//! action.

use std::sync::Arc;

use crate::storage::SharedDb;

const REFRESH_GENERATION_KEY: &str = "refresh_generation";

/// "The shared state changed, re-render now."
pub trait RefreshBridge: Send + Sync {
    fn notify_state_changed(&self);
}

/// Production bridge: bumps a monotonically increasing generation counter in
/// the shared database. Widget surfaces poll the generation and re-render
/// when it moves. Failures are swallowed -- a missed bump only delays the
/// next scheduled refresh.
pub struct WidgetRefreshBridge {
    db: Arc<SharedDb>,
}

impl WidgetRefreshBridge {
    pub fn new(db: Arc<SharedDb>) -> Self {
        Self { db }
    }

    /// Current refresh generation; 0 before the first notification.
    pub fn generation(&self) -> u64 {
        self.db
            .kv_get(REFRESH_GENERATION_KEY)
            .ok()
            .flatten()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }
}

impl RefreshBridge for WidgetRefreshBridge {
    fn notify_state_changed(&self) {
        let next = self.generation().wrapping_add(1);
        if let Err(e) = self.db.kv_set(REFRESH_GENERATION_KEY, &next.to_string()) {
            tracing::debug!(error = %e, "widget refresh notification dropped");
        }
    }
}
