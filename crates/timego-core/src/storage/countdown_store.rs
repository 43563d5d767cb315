//! The persistent shared state store.
//!
//! One durable record under one fixed key, readable by every independent
//! process. `save` replaces the whole record and fires the refresh bridge as
//! a side effect, so no caller can write state and forget to notify. `load`
//! never fails: absence and deserialization failure both fall back to the
//! idle default.

use std::sync::{Arc, Mutex};

use crate::bridge::RefreshBridge;
use crate::state::CountdownState;

use super::SharedDb;

const STATE_KEY: &str = "shared_countdown_state";

/// Store contract shared by the production store and the in-memory fake.
pub trait CountdownStore {
    /// Persist `state`, replacing the previous record, and notify widget
    /// surfaces. Storage failures are swallowed (and logged); the countdown
    /// keeps functioning in the writing process.
    fn save(&self, state: &CountdownState);

    /// Read the current record, or the idle default when nothing is
    /// persisted or the persisted bytes don't parse.
    fn load(&self) -> CountdownState;

    /// Reset to the idle default. Equivalent to `save(idle)`.
    fn clear(&self) {
        self.save(&CountdownState::idle());
    }
}

/// Production store backed by the shared SQLite database.
pub struct SharedStore {
    db: Arc<SharedDb>,
    bridge: Arc<dyn RefreshBridge>,
}

impl SharedStore {
    pub fn new(db: Arc<SharedDb>, bridge: Arc<dyn RefreshBridge>) -> Self {
        Self { db, bridge }
    }
}

impl CountdownStore for SharedStore {
    fn save(&self, state: &CountdownState) {
        let json = match serde_json::to_string(state) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "countdown state failed to serialize");
                return;
            }
        };
        match self.db.kv_set(STATE_KEY, &json) {
            Ok(()) => self.bridge.notify_state_changed(),
            Err(e) => tracing::error!(error = %e, "countdown state write failed"),
        }
    }

    fn load(&self) -> CountdownState {
        match self.db.kv_get(STATE_KEY) {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "persisted countdown state unreadable, treating as idle");
                CountdownState::idle()
            }),
            Ok(None) => CountdownState::idle(),
            Err(e) => {
                tracing::warn!(error = %e, "countdown state read failed, treating as idle");
                CountdownState::idle()
            }
        }
    }
}

/// In-memory single-slot store for tests and embedding.
pub struct MemoryStore {
    slot: Mutex<Option<CountdownState>>,
    bridge: Arc<dyn RefreshBridge>,
}

impl MemoryStore {
    pub fn new(bridge: Arc<dyn RefreshBridge>) -> Self {
        Self {
            slot: Mutex::new(None),
            bridge,
        }
    }
}

impl CountdownStore for MemoryStore {
    fn save(&self, state: &CountdownState) {
        let mut guard = self.slot.lock().unwrap_or_else(|p| p.into_inner());
        *guard = Some(state.clone());
        self.bridge.notify_state_changed();
    }

    fn load(&self) -> CountdownState {
        let guard = self.slot.lock().unwrap_or_else(|p| p.into_inner());
        guard.clone().unwrap_or_else(CountdownState::idle)
    }
}
