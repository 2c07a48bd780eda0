use crate::error::{FetchError, NotifyError, StoreError};
use crate::symbol::Symbol;
use crate::thresholds::{RawThresholds, ThresholdField};
use crate::types::{Exchange, FetchMode, HistoryPoint, RateQuote, Severity};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;

/// One perpetual-futures venue.
///
/// Implementations translate canonical symbols to the venue spelling, perform
/// the request, and map the payload back into [`RateQuote`]s. Failures are
/// returned as [`FetchError`]; adapters never panic on bad payloads.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    fn id(&self) -> Exchange;

    fn fetch_mode(&self) -> FetchMode {
        FetchMode::PerSymbol
    }

    /// Fetches the current funding rate and price for one symbol.
    async fn fetch_current(&self, symbol: &Symbol) -> Result<RateQuote, FetchError>;

    /// Fetches every listed instrument in one call.
    ///
    /// Only meaningful for [`FetchMode::Snapshot`] adapters.
    async fn fetch_snapshot(&self) -> Result<Vec<RateQuote>, FetchError> {
        Err(FetchError::unsupported(format!(
            "{} has no snapshot endpoint",
            self.id()
        )))
    }

    /// Fetches up to `count` settled funding rates, newest first.
    async fn fetch_history(
        &self,
        symbol: &Symbol,
        count: usize,
    ) -> Result<Vec<HistoryPoint>, FetchError>;
}

/// Operator-editable threshold storage.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<RawThresholds, StoreError>;

    async fn update(&self, field: ThresholdField, value: Decimal) -> Result<(), StoreError>;
}

/// Per-symbol alert suppression storage.
#[async_trait]
pub trait CooldownStore: Send + Sync {
    /// Inserts or overwrites the entry for `symbol`.
    async fn put(&self, symbol: &Symbol, expires_at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Removes entries whose expiry is at or before `now`. Returns the count.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Returns symbols whose entry expires after `now`.
    async fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<(Symbol, DateTime<Utc>)>, StoreError>;

    /// Returns the expiry stored for `symbol`, live or not.
    async fn expires_at(&self, symbol: &Symbol) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Removes the entry for `symbol`, if any.
    async fn remove(&self, symbol: &Symbol) -> Result<bool, StoreError>;
}

/// Assets currently withdrawable per venue.
#[async_trait]
pub trait WithdrawalAllowList: Send + Sync {
    /// Returns `None` when no data is available for `exchange`.
    async fn withdrawable(&self, exchange: Exchange) -> Option<HashSet<String>>;
}

/// Delivery channel for rendered alerts.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, severity: Severity, html: &str) -> Result<(), NotifyError>;
}
