//! Per-symbol alert suppression.

use chrono::{DateTime, Duration, Utc};
use funding_arb_core::{CooldownStore, StoreError, Symbol};
use std::collections::HashSet;
use std::sync::Arc;

/// Keeps symbols quiet for a fixed window after they alert.
#[derive(Clone)]
pub struct CooldownGate {
    store: Arc<dyn CooldownStore>,
    window: Duration,
}

impl CooldownGate {
    #[must_use]
    pub fn new(store: Arc<dyn CooldownStore>, window: Duration) -> Self {
        Self { store, window }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Purges expired entries and returns the symbols still cooling down.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read or written.
    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<HashSet<Symbol>, StoreError> {
        let purged = self.store.purge_expired(now).await?;
        if purged > 0 {
            tracing::debug!(purged, "Expired cooldowns purged");
        }

        Ok(self
            .store
            .list_active(now)
            .await?
            .into_iter()
            .map(|(symbol, _)| symbol)
            .collect())
    }

    /// Returns true if `symbol` has a live entry.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read.
    pub async fn is_cooling(&self, symbol: &Symbol, now: DateTime<Utc>) -> Result<bool, StoreError> {
        Ok(self
            .store
            .expires_at(symbol)
            .await?
            .is_some_and(|expires_at| expires_at > now))
    }

    /// Starts (or restarts) the window for `symbol`. Returns the expiry.
    ///
    /// # Errors
    ///
    /// Returns error if the entry cannot be written.
    pub async fn commit(&self, symbol: &Symbol, now: DateTime<Utc>) -> Result<DateTime<Utc>, StoreError> {
        let expires_at = now + self.window;
        self.store.put(symbol, expires_at).await?;
        Ok(expires_at)
    }
}

/// Removes cooling symbols from the universe, preserving order.
#[must_use]
pub fn filter_universe(universe: Vec<Symbol>, cooling: &HashSet<Symbol>) -> Vec<Symbol> {
    universe
        .into_iter()
        .filter(|symbol| !cooling.contains(symbol))
        .collect()
}
