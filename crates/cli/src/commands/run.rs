//! `run` and `scan-once` commands.
//!
//! Both build the same scanner from configuration: one adapter per enabled
//! exchange, `SQLite` (or in-memory) settings and cooldowns, the file-based
//! withdrawal allow-list, and either the Telegram sink or the log sink.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;
use funding_arb_core::{AppConfig, CooldownStore, NotificationSink, SettingsStore, TelegramConfig};
use funding_arb_exchanges::AdapterRegistry;
use funding_arb_scanner::{Collaborators, Scanner, UniverseSource};
use funding_arb_store::{FileAllowList, MemoryCooldownStore, MemorySettingsStore};
use funding_arb_telegram::{LogSink, TelegramSink};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use super::open_store;

/// Arguments shared by `run` and `scan-once`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Log alerts instead of sending them to Telegram
    #[arg(long)]
    pub dry_run: bool,

    /// Keep thresholds and cooldowns in memory instead of the database
    #[arg(long)]
    pub ephemeral: bool,

    /// Symbol universe file (overrides scanner.universe_path)
    #[arg(long)]
    pub universe: Option<PathBuf>,
}

fn select_sink(config: &TelegramConfig, dry_run: bool) -> Result<Arc<dyn NotificationSink>> {
    if dry_run || !config.enabled {
        info!(dry_run, "Alerts will be logged, not delivered");
        return Ok(Arc::new(LogSink));
    }

    let sink = TelegramSink::from_config(config)
        .context("telegram is enabled but not configured (use --dry-run to scan without it)")?;
    info!(threads = ?sink.threads(), "Delivering alerts to Telegram");
    Ok(Arc::new(sink))
}

async fn select_stores(
    config: &AppConfig,
    ephemeral: bool,
) -> Result<(Arc<dyn SettingsStore>, Arc<dyn CooldownStore>)> {
    if ephemeral {
        warn!("Ephemeral mode: thresholds use defaults and cooldowns are lost on exit");
        return Ok((
            Arc::new(MemorySettingsStore::default()),
            Arc::new(MemoryCooldownStore::new()),
        ));
    }

    let store = open_store(config).await?;
    Ok((Arc::new(store.clone()), Arc::new(store)))
}

/// Wires a scanner from configuration.
///
/// # Errors
/// Returns an error if no exchange is enabled, an HTTP client cannot be
/// built, the database cannot be opened, or Telegram is enabled without
/// credentials.
pub async fn build_scanner(config: &AppConfig, args: &RunArgs) -> Result<Scanner> {
    let registry = AdapterRegistry::from_config(&config.exchanges)?;
    if registry.is_empty() {
        bail!("no exchanges enabled; set exchanges.enabled in config/Config.toml");
    }

    let sink = select_sink(&config.telegram, args.dry_run)?;
    let (settings, cooldowns) = select_stores(config, args.ephemeral).await?;
    let universe_path = args
        .universe
        .clone()
        .unwrap_or_else(|| config.scanner.universe_path.clone());

    info!(
        exchanges = registry.len(),
        universe = %universe_path.display(),
        withdrawals = %config.withdrawals.directory.display(),
        "Scanner configured"
    );

    let parts = Collaborators {
        adapters: registry.iter().cloned().collect(),
        settings,
        cooldowns,
        allow_list: Arc::new(FileAllowList::new(&config.withdrawals.directory)),
        sink,
    };

    Ok(
        Scanner::new(&config.scanner, UniverseSource::File(universe_path), parts)
            .with_risky(config.exchanges.risky.iter().copied()),
    )
}

/// Runs the scanner until Ctrl+C.
///
/// # Errors
/// Returns an error if the scanner cannot be built.
pub async fn run_scanner(config: AppConfig, args: RunArgs) -> Result<()> {
    let scanner = Arc::new(build_scanner(&config, &args).await?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut handle = tokio::spawn({
        let scanner = Arc::clone(&scanner);
        async move { scanner.run(shutdown_rx).await }
    });

    tokio::select! {
        result = &mut handle => {
            result.context("scanner task panicked")?;
            return Ok(());
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, finishing current cycle");
        }
    }

    // the loop checks the flag between cycles, so an in-flight cycle completes
    let _ = shutdown_tx.send(true);
    handle.await.context("scanner task panicked")?;
    Ok(())
}

/// Runs one cycle and prints its summary.
///
/// # Errors
/// Returns an error if the scanner cannot be built or the cycle fails.
pub async fn run_scan_once(config: AppConfig, args: RunArgs) -> Result<()> {
    let scanner = build_scanner(&config, &args).await?;
    let summary = scanner.run_cycle(Utc::now()).await?;

    println!("Scan complete");
    println!("  universe:       {}", summary.universe);
    println!("  cooling down:   {}", summary.cooled_down);
    println!("  rows:           {}", summary.rows);
    println!("  eligible rows:  {}", summary.eligible_rows);
    println!("  candidates:     {}", summary.candidates);
    println!("  alerts sent:    {}", summary.alerts_sent);
    println!("  alerts failed:  {}", summary.alerts_failed);

    Ok(())
}
