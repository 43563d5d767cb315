//! # Timego Core Library
//!
//! Core logic for the Timego countdown app: the shared single-slot state
//! store, the widget refresh bridge, the countdown state machine, and the
//! live/ambient presentation protocol. The CLI binary is a thin layer over
//! this crate; each invocation is an independent process, and processes
//! share nothing but the durable store.
//!
//! ## Architecture
//!
//! - **Countdown engine**: a wall-clock state machine -- every operation
//!   takes `now`, elapsing is re-derived on every read, and no deadline
//!   callback is trusted to fire
//! - **Storage**: one SQLite-backed key-value record shared across
//!   processes, plus TOML-based configuration
//! - **Bridge**: fire-and-forget "state changed, re-render" signal to
//!   widget surfaces
//! - **Live activities**: lifecycle of the single ambient presentation,
//!   behind a platform seam trait
//!
//! ## Key components
//!
//! - [`CountdownEngine`]: state machine and orchestration
//! - [`CountdownStore`]: injected store interface (`save`/`load`/`clear`)
//! - [`RefreshBridge`]: state notification bridge
//! - [`LiveActivityManager`]: ambient presentation lifecycle

pub mod bridge;
pub mod countdown;
pub mod error;
pub mod events;
pub mod live;
pub mod notify;
pub mod state;
pub mod storage;

pub use bridge::{RefreshBridge, WidgetRefreshBridge};
pub use countdown::{CountdownEngine, DefaultEngine};
pub use error::{ConfigError, CoreError, CountdownError, StoreError};
pub use events::Event;
pub use live::{ActivityContent, ActivitySurface, LiveActivityManager, StoreSurface};
pub use notify::{DesktopScheduler, NotificationScheduler};
pub use state::{format_remaining, CountdownMode, CountdownState, Phase};
pub use storage::{Config, CountdownStore, MemoryStore, SharedDb, SharedStore};
