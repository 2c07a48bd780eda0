use crate::client::VenueClient;
use crate::de::{opt_decimal, opt_timestamp, vec_or_null};
use crate::venues::{history, quote};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use funding_arb_core::{
    Exchange, ExchangeAdapter, FetchError, FetchMode, HistoryPoint, RateQuote, Symbol,
};
use rust_decimal::Decimal;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api-futures.kucoin.com";

const SUCCESS: &str = "200000";
/// Suffix of USDT-margined linear contracts; inverse (`USDM`) and USDC contracts are skipped.
const LINEAR_SUFFIX: &str = "USDTM";
const HISTORY_LOOKBACK_HOURS: i64 = 48;

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(default)]
    code: String,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default, deserialize_with = "vec_or_null")]
    data: Vec<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<Vec<T>, FetchError> {
        if self.code != SUCCESS {
            return Err(FetchError::unsupported(format!(
                "code {}: {}",
                self.code,
                self.msg.unwrap_or_default()
            )));
        }
        Ok(self.data)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Contract {
    symbol: String,
    #[serde(default, deserialize_with = "opt_decimal")]
    funding_fee_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "opt_decimal")]
    index_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FundingEntry {
    #[serde(default, deserialize_with = "opt_decimal")]
    funding_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    timepoint: Option<i64>,
}

/// KuCoin futures, fetched as one snapshot of active contracts per cycle.
pub struct KucoinAdapter {
    client: VenueClient,
}

impl KucoinAdapter {
    #[must_use]
    pub fn new(client: VenueClient) -> Self {
        Self { client }
    }

    /// KuCoin lists bitcoin as `XBT`.
    fn contract(symbol: &Symbol) -> String {
        let base = match symbol.base() {
            "BTC" => "XBT",
            other => other,
        };
        format!("{base}{LINEAR_SUFFIX}")
    }
}

#[async_trait]
impl ExchangeAdapter for KucoinAdapter {
    fn id(&self) -> Exchange {
        Exchange::Kucoin
    }

    fn fetch_mode(&self) -> FetchMode {
        FetchMode::Snapshot
    }

    async fn fetch_current(&self, symbol: &Symbol) -> Result<RateQuote, FetchError> {
        self.fetch_snapshot()
            .await?
            .into_iter()
            .find(|q| &q.symbol == symbol)
            .ok_or_else(|| FetchError::unsupported(format!("{symbol} not listed")))
    }

    async fn fetch_snapshot(&self) -> Result<Vec<RateQuote>, FetchError> {
        let envelope: Envelope<Contract> = self.client.get("/api/v1/contracts/active", &[]).await?;

        Ok(envelope
            .into_data()?
            .into_iter()
            .filter(|c| c.symbol.ends_with(LINEAR_SUFFIX) && c.funding_fee_rate.is_some())
            .filter_map(|c| {
                let symbol = Symbol::normalize(&c.symbol)?;
                Some(quote(self.id(), &symbol, c.funding_fee_rate, c.index_price))
            })
            .collect())
    }

    async fn fetch_history(
        &self,
        symbol: &Symbol,
        count: usize,
    ) -> Result<Vec<HistoryPoint>, FetchError> {
        let to = Utc::now();
        let from = to - Duration::hours(HISTORY_LOOKBACK_HOURS);

        let envelope: Envelope<FundingEntry> = self
            .client
            .get(
                "/api/v1/contract/funding-rates",
                &[
                    ("symbol", Self::contract(symbol)),
                    ("from", from.timestamp_millis().to_string()),
                    ("to", to.timestamp_millis().to_string()),
                ],
            )
            .await?;

        Ok(history(
            envelope
                .into_data()?
                .into_iter()
                .map(|e| (e.funding_rate, e.timepoint)),
            count,
        ))
    }
}
