use crate::client::VenueClient;
use crate::de::{opt_decimal, opt_timestamp, vec_or_null};
use crate::venues::{history, quote};
use async_trait::async_trait;
use funding_arb_core::{Exchange, ExchangeAdapter, FetchError, HistoryPoint, RateQuote, Symbol};
use rust_decimal::Decimal;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.bitget.com";

const PRODUCT_TYPE: &str = "usdt-futures";
const SUCCESS: &str = "00000";

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
    fn into_first(self, symbol: &Symbol) -> Result<T, FetchError> {
        if self.code != SUCCESS {
            return Err(FetchError::unsupported(format!("code {}: {}", self.code, self.msg)));
        }
        self.data
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::unsupported(format!("{symbol} not listed")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentRate {
    #[serde(default, deserialize_with = "opt_decimal")]
    funding_rate: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct SymbolPrice {
    #[serde(default, deserialize_with = "opt_decimal")]
    price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FundingEntry {
    #[serde(default, deserialize_with = "opt_decimal")]
    funding_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    funding_time: Option<i64>,
}

/// Bitget v2 USDT-margined futures.
pub struct BitgetAdapter {
    client: VenueClient,
}

impl BitgetAdapter {
    #[must_use]
    pub fn new(client: VenueClient) -> Self {
        Self { client }
    }

    fn params(symbol: &Symbol) -> Vec<(&'static str, String)> {
        vec![
            ("symbol", symbol.to_string()),
            ("productType", PRODUCT_TYPE.to_string()),
        ]
    }
}

#[async_trait]
impl ExchangeAdapter for BitgetAdapter {
    fn id(&self) -> Exchange {
        Exchange::Bitget
    }

    async fn fetch_current(&self, symbol: &Symbol) -> Result<RateQuote, FetchError> {
        let params = Self::params(symbol);
        let (rate, price) = tokio::join!(
            self.client
                .get::<Envelope<CurrentRate>>("/api/v2/mix/market/current-fund-rate", &params),
            self.client
                .get::<Envelope<SymbolPrice>>("/api/v2/mix/market/symbol-price", &params),
        );

        let rate = rate?.into_first(symbol)?;
        let price = price?.into_first(symbol)?;

        Ok(quote(self.id(), symbol, rate.funding_rate, price.price))
    }

    async fn fetch_history(
        &self,
        symbol: &Symbol,
        count: usize,
    ) -> Result<Vec<HistoryPoint>, FetchError> {
        let mut params = Self::params(symbol);
        params.push(("pageSize", count.to_string()));

        let envelope: Envelope<FundingEntry> = self
            .client
            .get("/api/v2/mix/market/history-fund-rate", &params)
            .await?;

        if envelope.code != SUCCESS {
            return Err(FetchError::unsupported(format!(
                "code {}: {}",
                envelope.code, envelope.msg
            )));
        }

        Ok(history(
            envelope
                .data
                .into_iter()
                .map(|e| (e.funding_rate, e.funding_time)),
            count,
        ))
    }
}
