//! The canonical persisted countdown record and phase derivation.
//!
//! Exactly one record exists at a time; a save fully replaces the previous
//! one. The persisted `is_running`/`is_finished` flags are hints only -- the
//! writer that should flip them may have been asleep when the target instant
//! passed, so every reader derives its phase from the record *and* wall-clock
//! time via [`CountdownState::phase_at`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which surface started the countdown.
///
/// `Time2go` counts toward an absolute instant picked on a calendar;
/// `Countdown` toward now-plus-duration. The distinction only affects
/// display -- either way the target instant is the only thing that matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownMode {
    Time2go,
    Countdown,
}

/// Phase derived from a record at a given wall-clock instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Running,
    /// Reached zero, awaiting user acknowledgement.
    Finished,
}

/// The single canonical countdown snapshot shared across processes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountdownState {
    pub mode: CountdownMode,
    /// Absent means no countdown is active.
    #[serde(default)]
    pub target_instant: Option<DateTime<Utc>>,
    pub is_running: bool,
    /// Display label composed at start time; opaque to the core.
    pub title: String,
    /// Older persisted records predate this field; absence means false.
    #[serde(default)]
    pub is_finished: bool,
}

impl Default for CountdownState {
    fn default() -> Self {
        Self::idle()
    }
}

impl CountdownState {
    /// The idle default: no target, nothing running, nothing finished.
    pub fn idle() -> Self {
        Self {
            mode: CountdownMode::Time2go,
            target_instant: None,
            is_running: false,
            title: String::new(),
            is_finished: false,
        }
    }

    pub fn running(mode: CountdownMode, target: DateTime<Utc>, title: impl Into<String>) -> Self {
        Self {
            mode,
            target_instant: Some(target),
            is_running: true,
            title: title.into(),
            is_finished: false,
        }
    }

    /// The elapse transition: running stops, the finished flag is set, and
    /// target and title are retained for the done display.
    pub fn into_finished(mut self) -> Self {
        self.is_running = false;
        self.is_finished = true;
        self
    }

    /// Derive the phase at `now`.
    ///
    /// A record still flagged running whose target has passed counts as
    /// Finished here even before any writer has healed it.
    pub fn phase_at(&self, now: DateTime<Utc>) -> Phase {
        if self.is_finished {
            return Phase::Finished;
        }
        match (self.is_running, self.target_instant) {
            (true, Some(target)) if target <= now => Phase::Finished,
            (true, Some(_)) => Phase::Running,
            _ => Phase::Idle,
        }
    }

    /// True when the record claims Running but the target has already passed,
    /// i.e. the elapse transition is owed a write-back.
    pub fn needs_heal(&self, now: DateTime<Utc>) -> bool {
        !self.is_finished
            && self.is_running
            && self.target_instant.map_or(false, |target| target <= now)
    }

    /// Whole seconds until the target, clamped at zero.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        self.target_instant
            .map(|target| (target - now).num_seconds().max(0))
            .unwrap_or(0)
    }
}

/// `h:mm:ss` when an hour or more remains, `mm:ss` otherwise.
pub fn format_remaining(secs: i64) -> String {
    let secs = secs.max(0);
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn idle_default_has_no_target() {
        let state = CountdownState::idle();
        assert!(state.target_instant.is_none());
        assert!(!state.is_running);
        assert!(!state.is_finished);
        assert_eq!(state.phase_at(Utc::now()), Phase::Idle);
    }

    #[test]
    fn running_with_future_target_is_running() {
        let now = Utc::now();
        let state = CountdownState::running(CountdownMode::Countdown, now + Duration::seconds(60), "Focus");
        assert_eq!(state.phase_at(now), Phase::Running);
        assert!(!state.needs_heal(now));
    }

    #[test]
    fn running_with_past_target_derives_finished() {
        let now = Utc::now();
        let state = CountdownState::running(CountdownMode::Countdown, now - Duration::seconds(1), "Focus");
        assert_eq!(state.phase_at(now), Phase::Finished);
        assert!(state.needs_heal(now));
    }

    #[test]
    fn target_exactly_now_is_elapsed() {
        let now = Utc::now();
        let state = CountdownState::running(CountdownMode::Time2go, now, "Go");
        assert_eq!(state.phase_at(now), Phase::Finished);
        assert_eq!(state.remaining_secs(now), 0);
    }

    #[test]
    fn into_finished_clears_running_and_keeps_target() {
        let now = Utc::now();
        let target = now + Duration::seconds(5);
        let finished = CountdownState::running(CountdownMode::Time2go, target, "Go").into_finished();
        assert!(!finished.is_running);
        assert!(finished.is_finished);
        assert_eq!(finished.target_instant, Some(target));
        assert_eq!(finished.title, "Go");
        assert_eq!(finished.phase_at(now), Phase::Finished);
    }

    #[test]
    fn remaining_clamps_at_zero_and_truncates() {
        let now = Utc::now();
        let state = CountdownState::running(
            CountdownMode::Countdown,
            now + Duration::milliseconds(61_900),
            "Focus",
        );
        assert_eq!(state.remaining_secs(now), 61);
        let past = CountdownState::running(CountdownMode::Countdown, now - Duration::seconds(30), "Focus");
        assert_eq!(past.remaining_secs(now), 0);
    }

    #[test]
    fn missing_is_finished_deserializes_as_false() {
        // Records written before the finished flag existed.
        let json = r#"{"mode":"countdown","target_instant":null,"is_running":false,"title":""}"#;
        let state: CountdownState = serde_json::from_str(json).unwrap();
        assert!(!state.is_finished);
    }

    #[test]
    fn format_remaining_elides_zero_hours() {
        assert_eq!(format_remaining(59), "00:59");
        assert_eq!(format_remaining(61), "01:01");
        assert_eq!(format_remaining(3600), "01:00:00");
        assert_eq!(format_remaining(3661), "01:01:01");
        assert_eq!(format_remaining(-5), "00:00");
    }
}
