mod config;
pub mod countdown_store;
pub mod database;

pub use config::Config;
pub use countdown_store::{CountdownStore, MemoryStore, SharedStore};
pub use database::SharedDb;

use std::path::PathBuf;

use crate::error::{CoreError, Result};

/// Returns `~/.config/timego[-dev]/` based on TIMEGO_ENV.
///
/// Set TIMEGO_ENV=dev to use a development data directory. The directory is
/// the rendezvous point for every process sharing the countdown state, so it
/// must resolve identically in all of them.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TIMEGO_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("timego-dev")
    } else {
        base_dir.join("timego")
    };

    std::fs::create_dir_all(&dir).map_err(CoreError::Io)?;
    Ok(dir)
}
