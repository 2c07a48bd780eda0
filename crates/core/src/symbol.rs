//! Canonical instrument symbols.
//!
//! Every venue spells the same perpetual differently (`BTC_USDT`, `BTC-USDT-SWAP`,
//! `XBTUSDTM`, `BTC-PERP`, ...). All comparisons in the scanner happen on the
//! canonical `BASEQUOTE` form produced by [`Symbol::normalize`]; adapters convert
//! back to their venue spelling at the edge.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quote asset every tracked perpetual settles in.
pub const QUOTE_ASSET: &str = "USDT";

/// Venue suffixes that carry no instrument identity.
const VENUE_SUFFIXES: [&str; 2] = ["SWAP", "PERP"];

/// Canonical, venue-independent instrument identifier (e.g. `BTCUSDT`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Normalizes a venue-specific spelling into the canonical form.
    ///
    /// Returns `None` for input that contains no instrument characters.
    #[must_use]
    pub fn normalize(raw: &str) -> Option<Self> {
        let mut upper: String = raw
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();

        for suffix in VENUE_SUFFIXES {
            for sep in ['-', '_'] {
                let tail = format!("{sep}{suffix}");
                if let Some(stripped) = upper.strip_suffix(&tail) {
                    upper = stripped.to_string();
                }
            }
        }

        let mut compact: String = upper
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | '/' | ':'))
            .collect();

        // KuCoin linear contracts: XBTUSDTM / ETHUSDTM
        if let Some(stripped) = compact.strip_suffix("USDTM") {
            compact = format!("{stripped}{QUOTE_ASSET}");
        }

        if !compact.ends_with(QUOTE_ASSET) {
            compact.push_str(QUOTE_ASSET);
        }

        if compact.starts_with("XBT") {
            compact.replace_range(0..3, "BTC");
        }

        if compact.len() <= QUOTE_ASSET.len() {
            return None;
        }

        Some(Self(compact))
    }

    /// Returns the canonical string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the base asset (`BTC` for `BTCUSDT`).
    #[must_use]
    pub fn base(&self) -> &str {
        self.0.strip_suffix(QUOTE_ASSET).unwrap_or(&self.0)
    }

    /// Formats the symbol as `BASE{sep}USDT`.
    #[must_use]
    pub fn joined(&self, sep: &str) -> String {
        format!("{}{sep}{QUOTE_ASSET}", self.base())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(raw: &str) -> String {
        Symbol::normalize(raw).unwrap().as_str().to_string()
    }

    #[test]
    fn test_normalize_separators() {
        assert_eq!(sym("BTC_USDT"), "BTCUSDT");
        assert_eq!(sym("btc-usdt"), "BTCUSDT");
        assert_eq!(sym("BTC/USDT"), "BTCUSDT");
        assert_eq!(sym(" ethusdt \n"), "ETHUSDT");
    }

    #[test]
    fn test_normalize_venue_suffixes() {
        assert_eq!(sym("BTC-USDT-SWAP"), "BTCUSDT");
        assert_eq!(sym("SOL-PERP"), "SOLUSDT");
        assert_eq!(sym("XBTUSDTM"), "BTCUSDT");
        assert_eq!(sym("ETHUSDTM"), "ETHUSDT");
    }

    #[test]
    fn test_normalize_bare_base_asset() {
        // Hyperliquid lists coins without a quote asset
        assert_eq!(sym("DOGE"), "DOGEUSDT");
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert!(Symbol::normalize("").is_none());
        assert!(Symbol::normalize("USDT").is_none());
        assert!(Symbol::normalize(" _ ").is_none());
    }

    #[test]
    fn test_single_canonical_form() {
        let spellings = ["BTC_USDT", "BTCUSDT", "BTC-USDT", "BTC-USDT-SWAP", "XBTUSDTM", "BTC"];
        let canonical: std::collections::HashSet<_> =
            spellings.iter().filter_map(|s| Symbol::normalize(s)).collect();
        assert_eq!(canonical.len(), 1);
    }

    #[test]
    fn test_base_and_joined() {
        let s = Symbol::normalize("PEPE_USDT").unwrap();
        assert_eq!(s.base(), "PEPE");
        assert_eq!(s.joined("_"), "PEPE_USDT");
        assert_eq!(s.joined("-"), "PEPE-USDT");
        assert_eq!(s.to_string(), "PEPEUSDT");
    }
}
