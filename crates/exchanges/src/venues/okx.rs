use crate::client::VenueClient;
use crate::de::{opt_decimal, opt_timestamp, vec_or_null};
use crate::venues::{history, quote};
use async_trait::async_trait;
use funding_arb_core::{Exchange, ExchangeAdapter, FetchError, HistoryPoint, RateQuote, Symbol};
use rust_decimal::Decimal;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://www.okx.com";

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(default)]
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default, deserialize_with = "vec_or_null")]
    data: Vec<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<Vec<T>, FetchError> {
        if self.code != "0" {
            return Err(FetchError::unsupported(format!("code {}: {}", self.code, self.msg)));
        }
        Ok(self.data)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FundingRate {
    #[serde(default, deserialize_with = "opt_decimal")]
    funding_rate: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkPrice {
    #[serde(default, deserialize_with = "opt_decimal")]
    mark_px: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FundingEntry {
    #[serde(default, deserialize_with = "opt_decimal")]
    funding_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    funding_time: Option<i64>,
}

/// OKX USDT-margined perpetual swaps.
pub struct OkxAdapter {
    client: VenueClient,
}

impl OkxAdapter {
    #[must_use]
    pub fn new(client: VenueClient) -> Self {
        Self { client }
    }

    fn inst_id(symbol: &Symbol) -> String {
        format!("{}-SWAP", symbol.joined("-"))
    }
}

#[async_trait]
impl ExchangeAdapter for OkxAdapter {
    fn id(&self) -> Exchange {
        Exchange::Okx
    }

    async fn fetch_current(&self, symbol: &Symbol) -> Result<RateQuote, FetchError> {
        let inst_id = Self::inst_id(symbol);
        let rate_query = [("instId", inst_id.clone())];
        let mark_query = [("instType", "SWAP".to_string()), ("instId", inst_id.clone())];
        let (rate, mark) = tokio::join!(
            self.client.get::<Envelope<FundingRate>>("/api/v5/public/funding-rate", &rate_query),
            self.client.get::<Envelope<MarkPrice>>("/api/v5/public/mark-price", &mark_query),
        );

        let rate = rate?.into_data()?.into_iter().next();
        let mark = mark?.into_data()?.into_iter().next();

        let Some(mark) = mark else {
            return Err(FetchError::unsupported(format!("{inst_id} not listed")));
        };

        Ok(quote(
            self.id(),
            symbol,
            rate.and_then(|r| r.funding_rate),
            mark.mark_px,
        ))
    }

    async fn fetch_history(
        &self,
        symbol: &Symbol,
        count: usize,
    ) -> Result<Vec<HistoryPoint>, FetchError> {
        let envelope: Envelope<FundingEntry> = self
            .client
            .get(
                "/api/v5/public/funding-rate-history",
                &[
                    ("instId", Self::inst_id(symbol)),
                    ("limit", count.to_string()),
                ],
            )
            .await?;

        Ok(history(
            envelope
                .into_data()?
                .into_iter()
                .map(|e| (e.funding_rate, e.funding_time)),
            count,
        ))
    }
}
