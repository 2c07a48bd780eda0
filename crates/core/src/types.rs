//! Shared data types for the funding-rate scanner.
//!
//! These types flow through every stage of a polling cycle:
//! adapters produce [`RateQuote`]s, the join groups them per [`Symbol`],
//! the detector compares them, and the router renders [`HistoryPoint`]s.

use crate::symbol::Symbol;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Exchange Identifiers
// =============================================================================

/// Identifies a perpetual-futures venue.
///
/// Variants are declared in name order so the derived `Ord` matches
/// lexicographic ordering of [`Exchange::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Aevo,
    BingX,
    Bitget,
    Bybit,
    Gate,
    Hyperliquid,
    Kcex,
    Kucoin,
    Mexc,
    Okx,
}

impl Exchange {
    /// Every supported venue, in name order.
    pub const ALL: [Exchange; 10] = [
        Self::Aevo,
        Self::BingX,
        Self::Bitget,
        Self::Bybit,
        Self::Gate,
        Self::Hyperliquid,
        Self::Kcex,
        Self::Kucoin,
        Self::Mexc,
        Self::Okx,
    ];

    /// Returns the display name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aevo => "Aevo",
            Self::BingX => "BingX",
            Self::Bitget => "Bitget",
            Self::Bybit => "Bybit",
            Self::Gate => "Gate",
            Self::Hyperliquid => "Hyperliquid",
            Self::Kcex => "KCEX",
            Self::Kucoin => "KuCoin",
            Self::Mexc => "MEXC",
            Self::Okx => "OKX",
        }
    }

    /// Returns the lowercase key used in configuration and file names.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Aevo => "aevo",
            Self::BingX => "bingx",
            Self::Bitget => "bitget",
            Self::Bybit => "bybit",
            Self::Gate => "gate",
            Self::Hyperliquid => "hyperliquid",
            Self::Kcex => "kcex",
            Self::Kucoin => "kucoin",
            Self::Mexc => "mexc",
            Self::Okx => "okx",
        }
    }

    /// Returns the perpetual trading page for a symbol on this venue.
    #[must_use]
    pub fn trade_url(self, symbol: &Symbol) -> String {
        let base = symbol.base();
        match self {
            Self::Aevo => format!("https://app.aevo.xyz/perpetual/{base}"),
            Self::BingX => format!("https://bingx.com/en/perpetual/{base}-USDT/"),
            Self::Bitget => format!("https://www.bitget.com/futures/usdt/{base}USDT"),
            Self::Bybit => format!("https://www.bybit.com/trade/usdt/{base}USDT"),
            Self::Gate => format!("https://www.gate.io/futures/USDT/{base}_USDT"),
            Self::Hyperliquid => format!("https://app.hyperliquid.xyz/trade/{base}"),
            Self::Kcex => format!("https://www.kcex.com/futures/exchange/{base}_USDT"),
            Self::Kucoin => format!("https://www.kucoin.com/futures/trade/{base}USDTM"),
            Self::Mexc => format!("https://futures.mexc.com/exchange/{base}_USDT"),
            Self::Okx => format!("https://www.okx.com/trade-swap/{base}-USDT-SWAP"),
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when an exchange name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown exchange: {0}")]
pub struct UnknownExchange(pub String);

impl FromStr for Exchange {
    type Err = UnknownExchange;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|e| e.key() == needle)
            .ok_or_else(|| UnknownExchange(s.to_string()))
    }
}

// =============================================================================
// Quotes
// =============================================================================

/// How an adapter delivers current quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// One request (or request pair) per symbol.
    PerSymbol,
    /// One request returns every listed instrument.
    Snapshot,
}

/// A funding rate and mark/index price observed on one venue.
///
/// `None` fields mean the venue does not list the instrument or the value
/// could not be parsed. They are never interpreted as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateQuote {
    pub exchange: Exchange,
    pub symbol: Symbol,
    /// Current funding rate, in percent (0.01 = 0.01 %).
    pub funding_rate_pct: Option<Decimal>,
    pub price: Option<Decimal>,
    pub observed_at: DateTime<Utc>,
}

impl RateQuote {
    #[must_use]
    pub fn new(
        exchange: Exchange,
        symbol: Symbol,
        funding_rate_pct: Option<Decimal>,
        price: Option<Decimal>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            exchange,
            symbol,
            funding_rate_pct,
            price,
            observed_at,
        }
    }

    /// Returns true if both the rate and the price are present.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.funding_rate_pct.is_some() && self.price.is_some()
    }
}

/// A settled funding payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Settled funding rate, in percent.
    pub funding_rate_pct: Decimal,
    pub settled_at: DateTime<Utc>,
}

impl HistoryPoint {
    #[must_use]
    pub fn new(funding_rate_pct: Decimal, settled_at: DateTime<Utc>) -> Self {
        Self {
            funding_rate_pct,
            settled_at,
        }
    }

    /// Sorts points newest-first and keeps at most `limit`.
    #[must_use]
    pub fn newest_first(mut points: Vec<Self>, limit: usize) -> Vec<Self> {
        points.sort_by(|a, b| b.settled_at.cmp(&a.settled_at));
        points.truncate(limit);
        points
    }
}

/// Converts a venue timestamp to UTC.
///
/// Venues mix second, millisecond and nanosecond precision; the unit is
/// inferred from magnitude (13-digit values are milliseconds).
#[must_use]
pub fn timestamp_from_venue(raw: i64) -> Option<DateTime<Utc>> {
    let magnitude = raw.unsigned_abs();
    if magnitude >= 100_000_000_000_000_000 {
        Utc.timestamp_millis_opt(raw / 1_000_000).single()
    } else if magnitude >= 100_000_000_000_000 {
        Utc.timestamp_millis_opt(raw / 1_000).single()
    } else if magnitude >= 1_000_000_000_000 {
        Utc.timestamp_millis_opt(raw).single()
    } else {
        Utc.timestamp_opt(raw, 0).single()
    }
}

/// Converts a raw fractional funding rate (0.0001) to percent (0.01).
#[must_use]
pub fn fraction_to_pct(raw: Decimal) -> Decimal {
    (raw * Decimal::ONE_HUNDRED).normalize()
}

// =============================================================================
// Severity
// =============================================================================

/// Alert tier of a winning spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
