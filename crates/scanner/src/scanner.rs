//! One polling cycle and the outer loop.

use crate::cooldown::{filter_universe, CooldownGate};
use crate::detector::detect;
use crate::join::{join_quotes, JoinPolicy};
use crate::orchestrator::FetchOrchestrator;
use crate::router::{AlertRouter, DispatchOutcome};
use chrono::{DateTime, Utc};
use funding_arb_core::{
    load_universe, ConfigurationError, CooldownStore, Exchange, ExchangeAdapter,
    NotificationSink, ScannerConfig, SettingsStore, StoreError, Symbol, WithdrawalAllowList,
};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

/// Failure that aborts a cycle.
#[derive(Debug, Error)]
pub enum ScannerError {
    #[error("invalid thresholds: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("failed to load universe: {0:#}")]
    Universe(anyhow::Error),
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Where the symbol universe comes from.
#[derive(Debug, Clone)]
pub enum UniverseSource {
    /// Newline-delimited file, re-read every cycle.
    File(PathBuf),
    Static(Vec<Symbol>),
}

impl UniverseSource {
    async fn load(&self) -> Result<Vec<Symbol>, ScannerError> {
        match self {
            Self::File(path) => load_universe(path).await.map_err(ScannerError::Universe),
            Self::Static(symbols) => Ok(symbols.clone()),
        }
    }
}

/// Counters for one completed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Symbols in the universe before the cooldown filter.
    pub universe: usize,
    pub cooled_down: usize,
    pub rows: usize,
    pub eligible_rows: usize,
    pub candidates: usize,
    pub alerts_sent: usize,
    pub alerts_failed: usize,
}

/// External collaborators of the scanner.
pub struct Collaborators {
    pub adapters: Vec<Arc<dyn ExchangeAdapter>>,
    pub settings: Arc<dyn SettingsStore>,
    pub cooldowns: Arc<dyn CooldownStore>,
    pub allow_list: Arc<dyn WithdrawalAllowList>,
    pub sink: Arc<dyn NotificationSink>,
}

/// Runs the fetch, join, detect and dispatch pipeline.
pub struct Scanner {
    universe: UniverseSource,
    settings: Arc<dyn SettingsStore>,
    gate: CooldownGate,
    orchestrator: FetchOrchestrator,
    policy: JoinPolicy,
    router: AlertRouter,
    cycle_pause: Duration,
    error_pause: Duration,
}

impl Scanner {
    #[must_use]
    pub fn new(config: &ScannerConfig, universe: UniverseSource, parts: Collaborators) -> Self {
        let gate = CooldownGate::new(parts.cooldowns, config.cooldown_window());
        let router = AlertRouter::new(&parts.adapters, parts.sink, parts.allow_list, gate.clone())
            .with_history_depth(config.history_depth);
        let orchestrator = FetchOrchestrator::new(parts.adapters)
            .with_batch_size(config.batch_size)
            .with_inter_batch_delay(config.inter_batch_delay());

        Self {
            universe,
            settings: parts.settings,
            gate,
            orchestrator,
            policy: JoinPolicy::from_config(config),
            router,
            cycle_pause: config.cycle_pause(),
            error_pause: config.error_pause(),
        }
    }

    /// Marks venues whose exchange name gets a risk marker in alerts.
    #[must_use]
    pub fn with_risky(mut self, risky: impl IntoIterator<Item = Exchange>) -> Self {
        self.router = self.router.with_risky(risky);
        self
    }

    /// Runs one full cycle at `now`.
    ///
    /// # Errors
    ///
    /// Returns error if thresholds are invalid, the universe cannot be loaded,
    /// or the cooldown store cannot be read. Per-alert store failures are
    /// counted in the summary instead.
    #[instrument(skip(self), level = "info")]
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleSummary, ScannerError> {
        // one threshold snapshot per cycle
        let thresholds = self.settings.load().await?.validate()?;

        let cooling = self.gate.refresh(now).await?;
        let universe = self.universe.load().await?;
        let mut summary = CycleSummary {
            universe: universe.len(),
            ..Default::default()
        };

        let universe = filter_universe(universe, &cooling);
        summary.cooled_down = summary.universe - universe.len();

        let report = self.orchestrator.fetch_all(&universe).await;
        // quote age is measured from fetch completion; `now` only drives cooldowns
        let fetched_at = Utc::now();
        let rows = join_quotes(&universe, &report, &self.policy, fetched_at);
        summary.rows = rows.len();
        summary.eligible_rows = rows.values().filter(|row| row.is_eligible()).count();

        let candidates = detect(&rows, &thresholds);
        summary.candidates = candidates.len();

        for (candidate, severity) in &candidates {
            match self.gate.is_cooling(&candidate.symbol, now).await {
                Ok(true) => {
                    warn!(symbol = %candidate.symbol, "Candidate already cooling down; skipped");
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    error!(symbol = %candidate.symbol, error = %e, "Cooldown check failed; alert skipped");
                    summary.alerts_failed += 1;
                    continue;
                }
            }

            match self.router.dispatch(candidate, *severity, now).await {
                Ok(DispatchOutcome::Sent) => summary.alerts_sent += 1,
                Ok(DispatchOutcome::DeliveryFailed) => summary.alerts_failed += 1,
                Err(e) => {
                    error!(symbol = %candidate.symbol, error = %e, "Cooldown commit failed; alert not sent");
                    summary.alerts_failed += 1;
                }
            }
        }

        info!(
            universe = summary.universe,
            cooled_down = summary.cooled_down,
            rows = summary.rows,
            eligible = summary.eligible_rows,
            candidates = summary.candidates,
            sent = summary.alerts_sent,
            failed = summary.alerts_failed,
            "Cycle complete"
        );

        Ok(summary)
    }

    /// Runs cycles until `shutdown` becomes true.
    ///
    /// A failed or panicking cycle is logged and followed by the error pause;
    /// it never ends the loop. Cycles never overlap.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            cycle_pause = ?self.cycle_pause,
            exchanges = self.orchestrator.adapters().len(),
            "Scanner started"
        );

        while !*shutdown.borrow() {
            let cycle = AssertUnwindSafe(self.run_cycle(Utc::now())).catch_unwind();
            let pause = match cycle.await {
                Ok(Ok(_)) => self.cycle_pause,
                Ok(Err(e)) => {
                    error!(error = %e, "Cycle failed");
                    self.error_pause
                }
                Err(panic) => {
                    error!(panic = panic_message(panic.as_ref()), "Cycle panicked");
                    self.error_pause
                }
            };

            tokio::select! {
                () = tokio::time::sleep(pause) => {}
                changed = shutdown.changed() => {
                    // a dropped sender also stops the loop
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Scanner stopped");
    }
}
