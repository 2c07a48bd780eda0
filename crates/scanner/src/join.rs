//! Keyed join of per-exchange quotes into one row per symbol.

use crate::orchestrator::FetchReport;
use chrono::{DateTime, Duration, Utc};
use funding_arb_core::{Exchange, RateQuote, ScannerConfig, Symbol};
use std::collections::{BTreeMap, HashSet};

/// Usable quotes for one symbol, in exchange-name order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRow {
    pub symbol: Symbol,
    pub quotes: BTreeMap<Exchange, RateQuote>,
}

impl SymbolRow {
    #[must_use]
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            quotes: BTreeMap::new(),
        }
    }

    /// Rows need at least two usable exchanges to be compared.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.quotes.len() >= 2
    }

    #[must_use]
    pub fn quote(&self, exchange: Exchange) -> Option<&RateQuote> {
        self.quotes.get(&exchange)
    }

    #[must_use]
    pub fn exchanges(&self) -> Vec<Exchange> {
        self.quotes.keys().copied().collect()
    }
}

/// Rules for admitting quotes into rows.
#[derive(Debug, Clone, Default)]
pub struct JoinPolicy {
    /// Rows missing any of these exchanges are dropped.
    pub required_exchanges: Vec<Exchange>,
    /// Quotes older than this are treated as absent.
    pub max_quote_age: Option<Duration>,
}

impl JoinPolicy {
    #[must_use]
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            required_exchanges: config.required_exchanges.clone(),
            max_quote_age: config.max_quote_age(),
        }
    }

    fn admits(&self, quote: &RateQuote, fetched_at: DateTime<Utc>) -> bool {
        if !quote.is_usable() {
            return false;
        }
        match self.max_quote_age {
            Some(max_age) => fetched_at - quote.observed_at <= max_age,
            None => true,
        }
    }
}

/// Builds rows for the universe from one cycle's fetch report.
///
/// Failed slots and unusable or stale quotes leave their exchange out of the
/// row. Snapshot entries that match no universe symbol are dropped. Symbols
/// with no usable quote at all get no row.
///
/// `fetched_at` is when the fetch finished; quote age is measured from it.
#[must_use]
pub fn join_quotes(
    universe: &[Symbol],
    report: &FetchReport,
    policy: &JoinPolicy,
    fetched_at: DateTime<Utc>,
) -> BTreeMap<Symbol, SymbolRow> {
    let tracked: HashSet<&Symbol> = universe.iter().collect();
    let mut rows: BTreeMap<Symbol, SymbolRow> = BTreeMap::new();

    let per_symbol = report
        .slots
        .values()
        .flat_map(|slots| slots.values())
        .filter_map(|outcome| outcome.as_ref().ok());
    let snapshot = report
        .snapshots
        .values()
        .filter_map(|result| result.as_ref().ok())
        .flatten();

    for quote in per_symbol.chain(snapshot) {
        if !tracked.contains(&quote.symbol) || !policy.admits(quote, fetched_at) {
            continue;
        }
        rows.entry(quote.symbol.clone())
            .or_insert_with(|| SymbolRow::new(quote.symbol.clone()))
            .quotes
            .entry(quote.exchange)
            .or_insert_with(|| quote.clone());
    }

    if !policy.required_exchanges.is_empty() {
        rows.retain(|_, row| {
            policy
                .required_exchanges
                .iter()
                .all(|exchange| row.quotes.contains_key(exchange))
        });
    }

    rows
}
