use crate::client::VenueClient;
use crate::de::{opt_decimal, opt_timestamp, vec_or_null};
use crate::venues::{history, quote};
use async_trait::async_trait;
use funding_arb_core::{Exchange, ExchangeAdapter, FetchError, HistoryPoint, RateQuote, Symbol};
use rust_decimal::Decimal;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.bybit.com";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    result: Option<ListResult<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ListResult<T> {
    #[serde(default, deserialize_with = "vec_or_null")]
    list: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker {
    #[serde(default, deserialize_with = "opt_decimal")]
    funding_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "opt_decimal")]
    index_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FundingEntry {
    #[serde(default, deserialize_with = "opt_decimal")]
    funding_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    funding_rate_timestamp: Option<i64>,
}

impl<T> Envelope<T> {
    fn into_list(self) -> Result<Vec<T>, FetchError> {
        if self.ret_code != 0 {
            return Err(FetchError::unsupported(format!(
                "retCode {}: {}",
                self.ret_code, self.ret_msg
            )));
        }
        Ok(self.result.map(|r| r.list).unwrap_or_default())
    }
}

/// Bybit v5 linear perpetuals.
pub struct BybitAdapter {
    client: VenueClient,
}

impl BybitAdapter {
    #[must_use]
    pub fn new(client: VenueClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExchangeAdapter for BybitAdapter {
    fn id(&self) -> Exchange {
        Exchange::Bybit
    }

    async fn fetch_current(&self, symbol: &Symbol) -> Result<RateQuote, FetchError> {
        let envelope: Envelope<Ticker> = self
            .client
            .get(
                "/v5/market/tickers",
                &[
                    ("category", "linear".to_string()),
                    ("symbol", symbol.to_string()),
                ],
            )
            .await?;

        let ticker = envelope
            .into_list()?
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::unsupported(format!("{symbol} not listed")))?;

        Ok(quote(self.id(), symbol, ticker.funding_rate, ticker.index_price))
    }

    async fn fetch_history(
        &self,
        symbol: &Symbol,
        count: usize,
    ) -> Result<Vec<HistoryPoint>, FetchError> {
        let envelope: Envelope<FundingEntry> = self
            .client
            .get(
                "/v5/market/funding/history",
                &[
                    ("category", "linear".to_string()),
                    ("symbol", symbol.to_string()),
                    ("limit", count.to_string()),
                ],
            )
            .await?;

        let entries = envelope.into_list()?;
        Ok(history(
            entries
                .into_iter()
                .map(|e| (e.funding_rate, e.funding_rate_timestamp)),
            count,
        ))
    }
}
