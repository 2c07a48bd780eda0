//! Threshold inspection and editing.

use anyhow::{bail, Result};
use clap::Subcommand;
use funding_arb_core::{AppConfig, ConfigurationError, RawThresholds, SettingsStore, ThresholdField};
use rust_decimal::Decimal;
use tracing::warn;

use super::open_store;

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommand {
    /// Print the stored thresholds
    Show,
    /// Change one threshold; applies from the next scan cycle
    Set {
        /// spread_low, spread_medium, spread_high or price_diff
        field: ThresholdField,
        /// New value, in percentage points
        value: Decimal,
    },
}

/// Renders the thresholds as an aligned table.
fn format_thresholds(raw: &RawThresholds) -> String {
    let value = |v: Option<Decimal>| v.map_or_else(|| "(unset)".to_string(), |d| d.to_string());

    let mut out = String::new();
    for field in ThresholdField::ALL {
        let current = match field {
            ThresholdField::SpreadLow => raw.spread_low,
            ThresholdField::SpreadMedium => raw.spread_medium,
            ThresholdField::SpreadHigh => raw.spread_high,
            ThresholdField::MaxPriceDivergence => raw.max_price_divergence_pct,
        };
        out.push_str(&format!("{:<15}{}\n", field.as_str(), value(current)));
    }

    if let Err(e) = raw.validate() {
        out.push_str(&format!("\nWARNING: {e}; scanning is blocked until fixed\n"));
    }
    out
}

/// Writes one threshold after checking the result stays usable.
///
/// Missing fields elsewhere are tolerated so a damaged row can be repaired
/// one field at a time.
async fn apply_update(
    store: &dyn SettingsStore,
    field: ThresholdField,
    value: Decimal,
) -> Result<RawThresholds> {
    if value.is_sign_negative() {
        bail!("refusing to set {field} = {value}: thresholds must be non-negative");
    }

    let updated = store.load().await?.with_field(field, value);
    match updated.validate() {
        Ok(_) => {}
        Err(ConfigurationError::Missing(missing)) => {
            warn!(missing, "Thresholds still incomplete after update");
        }
        Err(e) => bail!("refusing to set {field} = {value}: {e}"),
    }

    store.update(field, value).await?;
    Ok(updated)
}

/// Runs a `settings` subcommand against the configured database.
///
/// # Errors
/// Returns an error if the database is unavailable or the new value would
/// leave the thresholds invalid.
pub async fn run_settings(config: AppConfig, command: SettingsCommand) -> Result<()> {
    let store = open_store(&config).await?;

    match command {
        SettingsCommand::Show => {
            print!("{}", format_thresholds(&store.load().await?));
        }
        SettingsCommand::Set { field, value } => {
            let updated = apply_update(&store, field, value).await?;
            println!("Updated {field} to {value}\n");
            print!("{}", format_thresholds(&updated));
        }
    }

    Ok(())
}
