use std::sync::Arc;

use clap::Subcommand;
use timego_core::{Config, DefaultEngine, RefreshBridge, SharedDb, WidgetRefreshBridge};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value by dot-separated key
    Get { key: String },
    /// Set a config value by dot-separated key
    Set { key: String, value: String },
    /// List the full configuration as TOML
    List,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load_or_default();
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown config key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load_or_default();
            config.set(&key, &value)?;
            println!("{key} = {value}");
            // Theme and language are read by surfaces at render time, not
            // carried in the presentation payload: re-push the live activity
            // unchanged so ambient surfaces re-evaluate them.
            if Config::affects_presentation(&key) {
                let mut engine = DefaultEngine::open()?;
                engine.refresh_presentation();
                let bridge = WidgetRefreshBridge::new(Arc::new(SharedDb::open()?));
                bridge.notify_state_changed();
            }
        }
        ConfigAction::List => {
            let config = Config::load_or_default();
            print!("{}", config.to_toml_string());
        }
    }

    Ok(())
}
