//! One adapter per venue.
//!
//! Adapters convert the canonical symbol to the venue spelling, call the
//! public market-data endpoints, and return rates in percent.

pub mod aevo;
pub mod bingx;
pub mod bitget;
pub mod bybit;
pub mod contract_api;
pub mod gate;
pub mod hyperliquid;
pub mod kucoin;
pub mod okx;

use chrono::Utc;
use funding_arb_core::{
    fraction_to_pct, timestamp_from_venue, Exchange, HistoryPoint, RateQuote, Symbol,
};
use rust_decimal::Decimal;

/// Builds a quote from a raw fractional rate observed now.
pub(crate) fn quote(
    exchange: Exchange,
    symbol: &Symbol,
    rate_fraction: Option<Decimal>,
    price: Option<Decimal>,
) -> RateQuote {
    RateQuote::new(
        exchange,
        symbol.clone(),
        rate_fraction.map(fraction_to_pct),
        price,
        Utc::now(),
    )
}

/// Converts raw `(fraction, timestamp)` pairs into at most `count` points,
/// newest first. Entries missing either value are skipped.
pub(crate) fn history<I>(entries: I, count: usize) -> Vec<HistoryPoint>
where
    I: IntoIterator<Item = (Option<Decimal>, Option<i64>)>,
{
    let points = entries
        .into_iter()
        .filter_map(|(rate, ts)| {
            let settled_at = timestamp_from_venue(ts?)?;
            Some(HistoryPoint::new(fraction_to_pct(rate?), settled_at))
        })
        .collect();
    HistoryPoint::newest_first(points, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_history_skips_incomplete_entries() {
        let points = history(
            vec![
                (Some(dec!(0.0001)), Some(1_700_000_000_000)),
                (None, Some(1_700_000_100_000)),
                (Some(dec!(0.0002)), None),
                (Some(dec!(0.0003)), Some(1_700_000_200)),
            ],
            4,
        );

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].funding_rate_pct, dec!(0.03));
        assert_eq!(points[1].funding_rate_pct, dec!(0.01));
    }

    #[test]
    fn test_quote_converts_fraction_to_percent() {
        let symbol = Symbol::normalize("BTCUSDT").unwrap();
        let q = quote(Exchange::Okx, &symbol, Some(dec!(0.0001)), Some(dec!(50000)));
        assert_eq!(q.funding_rate_pct, Some(dec!(0.01)));
        assert_eq!(q.price, Some(dec!(50000)));

        let q = quote(Exchange::Okx, &symbol, None, None);
        assert!(!q.is_usable());
    }
}
