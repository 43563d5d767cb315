use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{CountdownMode, Phase};

/// Every countdown transition produces an Event. Surfaces print or relay
/// them; tests assert on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    CountdownStarted {
        mode: CountdownMode,
        target_instant: DateTime<Utc>,
        title: String,
        at: DateTime<Utc>,
    },
    /// The elapse transition: the target instant passed and Finished was
    /// written back, whether by the tick loop or by an opportunistic read.
    CountdownElapsed {
        mode: CountdownMode,
        target_instant: Option<DateTime<Utc>>,
        title: String,
        at: DateTime<Utc>,
    },
    CountdownCancelled {
        at: DateTime<Utc>,
    },
    CountdownAcknowledged {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: Phase,
        mode: CountdownMode,
        title: String,
        target_instant: Option<DateTime<Utc>>,
        remaining_secs: i64,
        is_running: bool,
        is_finished: bool,
        at: DateTime<Utc>,
    },
}
