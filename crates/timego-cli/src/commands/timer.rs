use chrono::{DateTime, Duration, Utc};
use clap::Subcommand;
use timego_core::{format_remaining, CountdownMode, CountdownStore, DefaultEngine, Phase};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a countdown
    Start {
        /// Countdown length in minutes (countdown mode)
        #[arg(long, conflicts_with = "at")]
        minutes: Option<i64>,
        /// Additional seconds on top of --minutes (countdown mode)
        #[arg(long, conflicts_with = "at")]
        seconds: Option<i64>,
        /// Absolute target instant, RFC 3339 (time2go mode)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        /// Display label for every surface
        #[arg(long, default_value = "Countdown")]
        title: String,
        /// Keep ticking in the foreground until the countdown elapses
        #[arg(long)]
        watch: bool,
    },
    /// Cancel the running countdown
    Cancel,
    /// Acknowledge a finished countdown
    Ack,
    /// Print the current countdown state as JSON
    Status,
    /// Run the foreground tick loop until the countdown elapses
    Watch {
        /// Tick interval in seconds
        #[arg(long, default_value = "1")]
        interval: u64,
    },
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = DefaultEngine::open()?;
    let now = Utc::now();

    match action {
        TimerAction::Start {
            minutes,
            seconds,
            at,
            title,
            watch,
        } => {
            let (mode, target) = match at {
                Some(at) => (CountdownMode::Time2go, at),
                None => {
                    let total = minutes.unwrap_or(0) * 60 + seconds.unwrap_or(0);
                    if total <= 0 {
                        return Err("specify --minutes/--seconds or --at".into());
                    }
                    (CountdownMode::Countdown, now + Duration::seconds(total))
                }
            };
            let event = engine.start(mode, target, &title, now)?;
            println!("{}", serde_json::to_string_pretty(&event)?);
            if watch {
                tick_loop(&mut engine, 1)?;
            }
        }
        TimerAction::Cancel => {
            let event = engine.cancel(now);
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        TimerAction::Ack => {
            let state = engine.reconcile(now);
            if state.phase_at(now) == Phase::Finished {
                let event = engine.acknowledge(now);
                println!("{}", serde_json::to_string_pretty(&event)?);
            } else {
                // Nothing awaiting acknowledgement: report state instead.
                let snapshot = engine.snapshot(now);
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
        }
        TimerAction::Status => {
            engine.reconcile(now);
            let snapshot = engine.snapshot(now);
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        TimerAction::Watch { interval } => {
            tick_loop(&mut engine, interval)?;
        }
    }

    Ok(())
}

/// The foreground tick: drives the display and the local elapse transition
/// for as long as this process is in the foreground. Suspension simply stops
/// the loop; staleness is healed by the next read anywhere.
fn tick_loop(engine: &mut DefaultEngine, interval: u64) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(async {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval.max(1)));
        loop {
            ticker.tick().await;
            let now = Utc::now();
            if let Some(event) = engine.tick(now) {
                println!("{}", serde_json::to_string_pretty(&event)?);
                return Ok(());
            }
            let state = engine.store().load();
            match state.phase_at(now) {
                Phase::Running => println!("{}", format_remaining(state.remaining_secs(now))),
                Phase::Finished => {
                    // Already healed by someone else; nothing left to drive.
                    return Ok(());
                }
                Phase::Idle => {
                    println!("no countdown running");
                    return Ok(());
                }
            }
        }
    })
}
