//! Concurrent quote fetching across the universe and exchange set.
//!
//! Per-symbol adapters walk the universe in fixed-size batches: every fetch in a
//! batch runs concurrently, batches run one after another with a pause in
//! between, and exchanges run fully in parallel. Snapshot adapters are called
//! once, alongside the batches. A failure only ever affects its own slot.

use funding_arb_core::{Exchange, ExchangeAdapter, FetchError, FetchMode, RateQuote, Symbol};
use futures_util::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of one (exchange, symbol) slot.
pub type FetchOutcome = Result<RateQuote, FetchError>;

/// Everything fetched in one cycle.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Per-symbol results, keyed by exchange then symbol.
    pub slots: BTreeMap<Exchange, HashMap<Symbol, FetchOutcome>>,
    /// One result per snapshot adapter.
    pub snapshots: BTreeMap<Exchange, Result<Vec<RateQuote>, FetchError>>,
}

impl FetchReport {
    /// Number of per-symbol slots that produced a quote.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.slots
            .values()
            .flat_map(HashMap::values)
            .filter(|outcome| outcome.is_ok())
            .count()
    }

    /// Number of per-symbol slots and snapshots that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        let slots = self
            .slots
            .values()
            .flat_map(HashMap::values)
            .filter(|outcome| outcome.is_err())
            .count();
        let snapshots = self.snapshots.values().filter(|s| s.is_err()).count();
        slots + snapshots
    }
}

/// Fans adapter calls out across the universe.
pub struct FetchOrchestrator {
    adapters: Vec<Arc<dyn ExchangeAdapter>>,
    batch_size: usize,
    inter_batch_delay: Duration,
}

impl FetchOrchestrator {
    #[must_use]
    pub fn new(adapters: Vec<Arc<dyn ExchangeAdapter>>) -> Self {
        Self {
            adapters,
            batch_size: 20,
            inter_batch_delay: Duration::from_secs(2),
        }
    }

    /// Sets the number of concurrent fetches per batch (minimum 1).
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub fn with_inter_batch_delay(mut self, delay: Duration) -> Self {
        self.inter_batch_delay = delay;
        self
    }

    #[must_use]
    pub fn adapters(&self) -> &[Arc<dyn ExchangeAdapter>] {
        &self.adapters
    }

    /// Fetches current quotes for every symbol on every exchange.
    pub async fn fetch_all(&self, universe: &[Symbol]) -> FetchReport {
        if universe.is_empty() {
            return FetchReport::default();
        }

        let (per_symbol, snapshot): (Vec<_>, Vec<_>) = self
            .adapters
            .iter()
            .partition(|a| a.fetch_mode() == FetchMode::PerSymbol);

        let batched = join_all(
            per_symbol
                .into_iter()
                .map(|adapter| self.fetch_exchange(Arc::clone(adapter), universe)),
        );
        let snapshots = join_all(snapshot.into_iter().map(|adapter| async move {
            let result = adapter.fetch_snapshot().await;
            if let Err(e) = &result {
                warn!(exchange = %adapter.id(), error = %e, "Snapshot fetch failed");
            }
            (adapter.id(), result)
        }));

        let (batched, snapshots) = tokio::join!(batched, snapshots);

        let report = FetchReport {
            slots: batched.into_iter().collect(),
            snapshots: snapshots.into_iter().collect(),
        };

        info!(
            symbols = universe.len(),
            exchanges = self.adapters.len(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Fetch complete"
        );

        report
    }

    async fn fetch_exchange(
        &self,
        adapter: Arc<dyn ExchangeAdapter>,
        universe: &[Symbol],
    ) -> (Exchange, HashMap<Symbol, FetchOutcome>) {
        let exchange = adapter.id();
        let batches: Vec<&[Symbol]> = universe.chunks(self.batch_size).collect();
        let mut results = HashMap::with_capacity(universe.len());

        for (index, batch) in batches.iter().enumerate() {
            debug!(%exchange, batch = index + 1, of = batches.len(), size = batch.len(), "Fetching batch");

            let outcomes = join_all(batch.iter().map(|symbol| {
                let adapter = Arc::clone(&adapter);
                async move { (symbol.clone(), adapter.fetch_current(symbol).await) }
            }))
            .await;

            for (symbol, outcome) in outcomes {
                match &outcome {
                    Err(e) if e.is_unsupported() => {
                        debug!(%exchange, %symbol, reason = %e, "Instrument not supported");
                    }
                    Err(e) => warn!(%exchange, %symbol, error = %e, "Fetch failed"),
                    Ok(_) => {}
                }
                results.insert(symbol, outcome);
            }

            if index + 1 < batches.len() {
                tokio::time::sleep(self.inter_batch_delay).await;
            }
        }

        (exchange, results)
    }
}
