//! The widget surface: an independent reader of the shared state.
//!
//! Runs in its own process, shares nothing with the timer commands but the
//! durable store, and derives its display from the record plus wall-clock
//! time -- including healing a stale Running record before rendering.

use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::Subcommand;
use timego_core::{
    format_remaining, Config, CountdownMode, DefaultEngine, Phase, SharedDb, StoreSurface,
    WidgetRefreshBridge,
};

#[derive(Subcommand)]
pub enum WidgetAction {
    /// Render the widget view from the shared state
    Render {
        /// Print the state snapshot as JSON instead of the rendered view
        #[arg(long)]
        json: bool,
    },
    /// Print the widget's next-refresh policy as JSON
    Timeline,
    /// Render the ambient (lock-screen) presentation, if one is registered
    Live,
}

pub fn run(action: WidgetAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = DefaultEngine::open()?;
    let now = Utc::now();

    match action {
        WidgetAction::Render { json } => {
            // Re-derive before rendering; the widget may be the first reader
            // to notice the target instant has passed.
            let state = engine.reconcile(now);
            if json {
                let snapshot = engine.snapshot(now);
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
                return Ok(());
            }
            match state.phase_at(now) {
                Phase::Finished => match state.mode {
                    CountdownMode::Countdown => println!("Time's up!"),
                    CountdownMode::Time2go => println!("{}", state.title),
                },
                Phase::Running => {
                    println!("{}", state.title);
                    println!("{}", format_remaining(state.remaining_secs(now)));
                }
                Phase::Idle => println!("No countdown running"),
            }
        }
        WidgetAction::Timeline => {
            let state = engine.reconcile(now);
            // Refresh at the target while a countdown is live, otherwise
            // settle into a slow periodic poll.
            let next_refresh = match (state.is_running, state.target_instant) {
                (true, Some(target)) if target > now => target,
                _ => now + Duration::minutes(15),
            };
            let db = SharedDb::open()?;
            let generation = WidgetRefreshBridge::new(std::sync::Arc::new(db)).generation();
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "next_refresh": next_refresh.to_rfc3339(),
                    "refresh_generation": generation,
                }))?
            );
        }
        WidgetAction::Live => {
            let config = Config::load_or_default();
            let surface = StoreSurface::new(Arc::new(SharedDb::open()?), config.live_activity.enabled);
            let visible = surface.visible();
            if visible.is_empty() {
                println!("no live activity");
            }
            for content in visible {
                if content.is_done {
                    println!("{}: done", content.title);
                } else {
                    println!(
                        "{}: {}",
                        content.title,
                        format_remaining((content.target_instant - now).num_seconds())
                    );
                }
            }
        }
    }

    Ok(())
}
