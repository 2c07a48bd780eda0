use crate::client::VenueClient;
use crate::de::{opt_decimal, opt_timestamp};
use crate::venues::{history, quote};
use async_trait::async_trait;
use funding_arb_core::{Exchange, ExchangeAdapter, FetchError, HistoryPoint, RateQuote, Symbol};
use rust_decimal::Decimal;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://open-api.bingx.com";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self, symbol: &Symbol) -> Result<T, FetchError> {
        if self.code != 0 {
            return Err(FetchError::unsupported(format!("code {}: {}", self.code, self.msg)));
        }
        self.data
            .ok_or_else(|| FetchError::unsupported(format!("{symbol} not listed")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PremiumIndex {
    #[serde(default, deserialize_with = "opt_decimal")]
    last_funding_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "opt_decimal")]
    index_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FundingEntry {
    #[serde(default, deserialize_with = "opt_decimal")]
    funding_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    funding_time: Option<i64>,
}

/// BingX perpetual swap v2.
pub struct BingXAdapter {
    client: VenueClient,
}

impl BingXAdapter {
    #[must_use]
    pub fn new(client: VenueClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExchangeAdapter for BingXAdapter {
    fn id(&self) -> Exchange {
        Exchange::BingX
    }

    async fn fetch_current(&self, symbol: &Symbol) -> Result<RateQuote, FetchError> {
        let envelope: Envelope<PremiumIndex> = self
            .client
            .get(
                "/openApi/swap/v2/quote/premiumIndex",
                &[("symbol", symbol.joined("-"))],
            )
            .await?;

        let index = envelope.into_data(symbol)?;
        Ok(quote(self.id(), symbol, index.last_funding_rate, index.index_price))
    }

    async fn fetch_history(
        &self,
        symbol: &Symbol,
        count: usize,
    ) -> Result<Vec<HistoryPoint>, FetchError> {
        let envelope: Envelope<Vec<FundingEntry>> = self
            .client
            .get(
                "/openApi/swap/v2/quote/fundingRate",
                &[
                    ("symbol", symbol.joined("-")),
                    ("limit", count.to_string()),
                ],
            )
            .await?;

        let entries = envelope.into_data(symbol)?;
        Ok(history(
            entries.into_iter().map(|e| (e.funding_rate, e.funding_time)),
            count,
        ))
    }
}
