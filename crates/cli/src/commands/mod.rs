//! CLI commands for the funding-rate arbitrage scanner.

pub mod cooldown;
pub mod run;
pub mod settings;

pub use cooldown::{run_cooldown, CooldownCommand};
pub use run::{run_scan_once, run_scanner, RunArgs};
pub use settings::{run_settings, SettingsCommand};

use anyhow::{Context, Result};
use funding_arb_core::{AppConfig, ConfigLoader};
use funding_arb_store::SqliteStore;

/// Loads configuration, merging the profile file when one is given.
///
/// # Errors
/// Returns an error if a config file or environment override cannot be parsed.
pub fn load_config(profile: Option<&str>) -> Result<AppConfig> {
    match profile {
        Some(profile) => ConfigLoader::load_with_profile(profile)
            .with_context(|| format!("failed to load config profile `{profile}`")),
        None => ConfigLoader::load().context("failed to load config"),
    }
}

/// Opens the configured `SQLite` database.
///
/// # Errors
/// Returns an error if the database cannot be opened or migrated.
pub async fn open_store(config: &AppConfig) -> Result<SqliteStore> {
    SqliteStore::connect(&config.database.url, config.database.max_connections)
        .await
        .with_context(|| format!("failed to open database {}", config.database.url))
}
