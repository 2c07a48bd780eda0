//! MEXC contract API, also served by KCEX under a different prefix.
//!
//! Relisted tokens trade under a `NEW` suffix (`LUNANEW_USDT`); when the
//! primary contract has no recent deals the alias is tried for the price.

use crate::client::VenueClient;
use crate::de::{opt_decimal, opt_timestamp, vec_or_null};
use crate::venues::{history, quote};
use async_trait::async_trait;
use funding_arb_core::{Exchange, ExchangeAdapter, FetchError, HistoryPoint, RateQuote, Symbol};
use rust_decimal::Decimal;
use serde::Deserialize;

pub const MEXC_BASE_URL: &str = "https://futures.mexc.com";
pub const KCEX_BASE_URL: &str = "https://www.kcex.io";

const MEXC_PREFIX: &str = "/api/v1/contract";
const KCEX_PREFIX: &str = "/fapi/v1/contract";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self, symbol: &Symbol) -> Result<T, FetchError> {
        if !self.success {
            return Err(FetchError::unsupported(format!(
                "code {}: {}",
                self.code,
                self.message.unwrap_or_default()
            )));
        }
        self.data
            .ok_or_else(|| FetchError::unsupported(format!("{symbol} has no contract data")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FundingRate {
    #[serde(default, deserialize_with = "opt_decimal")]
    funding_rate: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct Deal {
    #[serde(default, deserialize_with = "opt_decimal")]
    p: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryPage {
    #[serde(default, deserialize_with = "vec_or_null")]
    result_list: Vec<FundingEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FundingEntry {
    #[serde(default, deserialize_with = "opt_decimal")]
    funding_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    settle_time: Option<i64>,
}

/// Adapter for venues exposing the MEXC contract API.
pub struct ContractApiAdapter {
    exchange: Exchange,
    prefix: &'static str,
    client: VenueClient,
}

impl ContractApiAdapter {
    #[must_use]
    pub fn mexc(client: VenueClient) -> Self {
        Self {
            exchange: Exchange::Mexc,
            prefix: MEXC_PREFIX,
            client,
        }
    }

    #[must_use]
    pub fn kcex(client: VenueClient) -> Self {
        Self {
            exchange: Exchange::Kcex,
            prefix: KCEX_PREFIX,
            client,
        }
    }

    async fn last_deal_price(&self, contract: &str) -> Result<Option<Decimal>, FetchError> {
        let envelope: Envelope<Vec<Deal>> = self
            .client
            .get(&format!("{}/deals/{contract}", self.prefix), &[])
            .await?;

        if !envelope.success {
            return Ok(None);
        }
        Ok(envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|deal| deal.p))
    }
}

#[async_trait]
impl ExchangeAdapter for ContractApiAdapter {
    fn id(&self) -> Exchange {
        self.exchange
    }

    async fn fetch_current(&self, symbol: &Symbol) -> Result<RateQuote, FetchError> {
        let contract = symbol.joined("_");

        let rate_path = format!("{}/funding_rate/{contract}", self.prefix);
        let (rate, price) = tokio::join!(
            self.client.get::<Envelope<FundingRate>>(&rate_path, &[]),
            self.last_deal_price(&contract),
        );

        let rate = rate?.into_data(symbol)?;
        let price = match price? {
            Some(price) => Some(price),
            None => {
                let alias = format!("{}NEW_USDT", symbol.base());
                tracing::debug!(exchange = %self.exchange, %alias, "No deals, trying relisted contract");
                self.last_deal_price(&alias).await?
            }
        };

        Ok(quote(self.exchange, symbol, rate.funding_rate, price))
    }

    async fn fetch_history(
        &self,
        symbol: &Symbol,
        count: usize,
    ) -> Result<Vec<HistoryPoint>, FetchError> {
        let envelope: Envelope<HistoryPage> = self
            .client
            .get(
                &format!("{}/funding_rate/history", self.prefix),
                &[
                    ("symbol", symbol.joined("_")),
                    ("page_num", "1".to_string()),
                    ("page_size", count.to_string()),
                ],
            )
            .await?;

        let page = envelope.into_data(symbol)?;
        Ok(history(
            page.result_list
                .into_iter()
                .map(|e| (e.funding_rate, e.settle_time)),
            count,
        ))
    }
}
