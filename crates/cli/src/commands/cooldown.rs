//! Cooldown inspection and manual release.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use funding_arb_core::{AppConfig, CooldownStore, Symbol};

use super::open_store;

#[derive(Subcommand, Debug, Clone)]
pub enum CooldownCommand {
    /// List symbols whose alerts are currently suppressed
    List,
    /// Release a symbol so it can alert again on the next cycle
    Clear {
        /// Symbol in any common spelling (BTC, btc-usdt, BTC_USDT)
        symbol: String,
    },
}

fn format_active(entries: &[(Symbol, DateTime<Utc>)], now: DateTime<Utc>) -> String {
    if entries.is_empty() {
        return "No active cooldowns\n".to_string();
    }

    let mut out = format!("{:<16}{:<22}{}\n", "SYMBOL", "EXPIRES (UTC)", "REMAINING");
    for (symbol, expires_at) in entries {
        let remaining = (*expires_at - now).num_minutes().max(0);
        out.push_str(&format!(
            "{:<16}{:<22}{}m\n",
            symbol.as_str(),
            expires_at.format("%Y-%m-%d %H:%M:%S"),
            remaining
        ));
    }
    out
}

async fn clear(store: &dyn CooldownStore, raw: &str) -> Result<(Symbol, bool)> {
    let symbol = Symbol::normalize(raw).ok_or_else(|| anyhow!("invalid symbol: {raw:?}"))?;
    let removed = store.remove(&symbol).await?;
    Ok((symbol, removed))
}

/// Runs a `cooldown` subcommand against the configured database.
///
/// # Errors
/// Returns an error if the database is unavailable or the symbol is empty.
pub async fn run_cooldown(config: AppConfig, command: CooldownCommand) -> Result<()> {
    let store = open_store(&config).await?;
    let now = Utc::now();

    match command {
        CooldownCommand::List => {
            store.purge_expired(now).await?;
            print!("{}", format_active(&store.list_active(now).await?, now));
        }
        CooldownCommand::Clear { symbol } => match clear(&store, &symbol).await? {
            (symbol, true) => println!("Cleared cooldown for {symbol}"),
            (symbol, false) => println!("{symbol} was not cooling down"),
        },
    }

    Ok(())
}
