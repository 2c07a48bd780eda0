use crate::client::VenueClient;
use crate::de::{decimal_from_value, opt_decimal, timestamp_from_value, vec_or_null};
use crate::venues::{history, quote};
use async_trait::async_trait;
use funding_arb_core::{Exchange, ExchangeAdapter, FetchError, HistoryPoint, RateQuote, Symbol};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_BASE_URL: &str = "https://api.aevo.xyz";

#[derive(Debug, Deserialize)]
struct Funding {
    #[serde(default, deserialize_with = "opt_decimal")]
    funding_rate: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct Statistics {
    #[serde(default, deserialize_with = "opt_decimal")]
    mark_price: Option<Decimal>,
}

/// Rows are `[instrument_name, timestamp_ns, funding_rate, mark_price]`.
#[derive(Debug, Deserialize)]
struct FundingHistory {
    #[serde(default, deserialize_with = "vec_or_null")]
    funding_history: Vec<Vec<Value>>,
}

/// Aevo perpetuals (`BTC-PERP`).
pub struct AevoAdapter {
    client: VenueClient,
}

impl AevoAdapter {
    #[must_use]
    pub fn new(client: VenueClient) -> Self {
        Self { client }
    }

    fn instrument(symbol: &Symbol) -> String {
        format!("{}-PERP", symbol.base())
    }
}

fn not_found_as_unsupported(err: FetchError) -> FetchError {
    match err {
        FetchError::Transient(msg) if msg.contains("NOT_FOUND") => FetchError::Unsupported(msg),
        other => other,
    }
}

#[async_trait]
impl ExchangeAdapter for AevoAdapter {
    fn id(&self) -> Exchange {
        Exchange::Aevo
    }

    async fn fetch_current(&self, symbol: &Symbol) -> Result<RateQuote, FetchError> {
        let funding_query = [("instrument_name", Self::instrument(symbol))];
        let stats_query = [
            ("asset", symbol.base().to_string()),
            ("instrument_type", "PERPETUAL".to_string()),
        ];
        let (funding, stats) = tokio::join!(
            self.client.get::<Funding>("/funding", &funding_query),
            self.client.get::<Statistics>("/statistics", &stats_query),
        );

        let funding = funding.map_err(not_found_as_unsupported)?;
        let stats = stats.map_err(not_found_as_unsupported)?;

        if funding.funding_rate.is_none() {
            return Err(FetchError::unsupported(format!("{symbol} has no funding rate")));
        }

        Ok(quote(self.id(), symbol, funding.funding_rate, stats.mark_price))
    }

    async fn fetch_history(
        &self,
        symbol: &Symbol,
        count: usize,
    ) -> Result<Vec<HistoryPoint>, FetchError> {
        let page: FundingHistory = self
            .client
            .get(
                "/funding-history",
                &[
                    ("instrument_name", Self::instrument(symbol)),
                    ("limit", count.to_string()),
                ],
            )
            .await
            .map_err(not_found_as_unsupported)?;

        Ok(history(
            page.funding_history.iter().map(|row| {
                (
                    row.get(2).and_then(decimal_from_value),
                    row.get(1).and_then(timestamp_from_value),
                )
            }),
            count,
        ))
    }
}
