//! Pairwise spread detection.
//!
//! For every eligible row the detector compares each unordered exchange pair,
//! keeps the pairs that clear the spread and price-divergence thresholds, and
//! selects the single widest one. Pairs are visited in exchange-name order and
//! only a strictly wider spread replaces the current best, so ties resolve the
//! same way on every run.

use crate::join::SymbolRow;
use funding_arb_core::{Exchange, Severity, Symbol, Thresholds};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Divergence reported when prices cannot be compared.
pub const MAX_DIVERGENCE_PCT: Decimal = Decimal::ONE_HUNDRED;

/// The widest qualifying pair for a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadCandidate {
    pub symbol: Symbol,
    pub exchange_a: Exchange,
    pub exchange_b: Exchange,
    pub rate_a: Decimal,
    pub rate_b: Decimal,
    pub price_a: Decimal,
    pub price_b: Decimal,
    /// Absolute rate difference, in percentage points.
    pub spread: Decimal,
    pub price_divergence_pct: Decimal,
}

/// Absolute difference between two funding rates.
#[must_use]
pub fn spread(rate_a: Decimal, rate_b: Decimal) -> Decimal {
    (rate_a - rate_b).abs()
}

/// Relative price difference in percent of the lower price.
///
/// Absent or non-positive prices yield [`MAX_DIVERGENCE_PCT`].
#[must_use]
pub fn price_divergence_pct(price_a: Option<Decimal>, price_b: Option<Decimal>) -> Decimal {
    let (Some(a), Some(b)) = (price_a, price_b) else {
        return MAX_DIVERGENCE_PCT;
    };
    let min = a.min(b);
    if min <= Decimal::ZERO {
        return MAX_DIVERGENCE_PCT;
    }

    (a - b)
        .abs()
        .checked_div(min)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::MAX)
}

/// Selects the widest qualifying pair in a row, if any.
#[must_use]
pub fn best_candidate(row: &SymbolRow, thresholds: &Thresholds) -> Option<SpreadCandidate> {
    let quotes: Vec<_> = row.quotes.values().collect();
    let mut best: Option<SpreadCandidate> = None;

    for (i, a) in quotes.iter().enumerate() {
        for b in &quotes[i + 1..] {
            let (Some(rate_a), Some(rate_b)) = (a.funding_rate_pct, b.funding_rate_pct) else {
                continue;
            };
            let (Some(price_a), Some(price_b)) = (a.price, b.price) else {
                continue;
            };

            let spread = spread(rate_a, rate_b);
            let divergence = price_divergence_pct(Some(price_a), Some(price_b));
            if !thresholds.qualifies(spread, divergence) {
                continue;
            }

            if best.as_ref().is_some_and(|current| spread <= current.spread) {
                continue;
            }

            best = Some(SpreadCandidate {
                symbol: row.symbol.clone(),
                exchange_a: a.exchange,
                exchange_b: b.exchange,
                rate_a,
                rate_b,
                price_a,
                price_b,
                spread,
                price_divergence_pct: divergence,
            });
        }
    }

    best
}

/// Runs detection over every eligible row.
///
/// Returns at most one candidate per symbol, each paired with its tier.
#[must_use]
pub fn detect(
    rows: &BTreeMap<Symbol, SymbolRow>,
    thresholds: &Thresholds,
) -> Vec<(SpreadCandidate, Severity)> {
    rows.values()
        .filter(|row| row.is_eligible())
        .filter_map(|row| best_candidate(row, thresholds))
        .filter_map(|candidate| {
            let severity = thresholds.classify(candidate.spread)?;
            tracing::debug!(
                symbol = %candidate.symbol,
                a = %candidate.exchange_a,
                b = %candidate.exchange_b,
                spread = %candidate.spread,
                divergence = %candidate.price_divergence_pct,
                severity = severity.as_str(),
                "Spread qualifies"
            );
            Some((candidate, severity))
        })
        .collect()
}
