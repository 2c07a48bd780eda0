use crate::client::VenueClient;
use crate::de::{opt_decimal, opt_timestamp};
use crate::venues::{history, quote};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use funding_arb_core::{
    Exchange, ExchangeAdapter, FetchError, FetchMode, HistoryPoint, RateQuote, Symbol,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

pub const DEFAULT_BASE_URL: &str = "https://api.hyperliquid.xyz";

/// How far back the history request reaches; funding settles hourly.
const HISTORY_LOOKBACK_HOURS: i64 = 48;

#[derive(Debug, Deserialize)]
struct Meta {
    universe: Vec<AssetMeta>,
}

#[derive(Debug, Deserialize)]
struct AssetMeta {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetCtx {
    #[serde(default, deserialize_with = "opt_decimal")]
    funding: Option<Decimal>,
    #[serde(default, deserialize_with = "opt_decimal")]
    mark_px: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FundingEntry {
    #[serde(default, deserialize_with = "opt_decimal")]
    funding_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    time: Option<i64>,
}

/// Hyperliquid perpetuals, fetched as one snapshot per cycle.
pub struct HyperliquidAdapter {
    client: VenueClient,
}

impl HyperliquidAdapter {
    #[must_use]
    pub fn new(client: VenueClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExchangeAdapter for HyperliquidAdapter {
    fn id(&self) -> Exchange {
        Exchange::Hyperliquid
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
        let (meta, ctxs): (Meta, Vec<AssetCtx>) = self
            .client
            .post("/info", &json!({ "type": "metaAndAssetCtxs" }))
            .await?;

        if meta.universe.len() != ctxs.len() {
            return Err(FetchError::malformed(format!(
                "universe has {} assets but {} contexts",
                meta.universe.len(),
                ctxs.len()
            )));
        }

        Ok(meta
            .universe
            .iter()
            .zip(ctxs)
            .filter_map(|(asset, ctx)| {
                let symbol = Symbol::normalize(&asset.name)?;
                Some(quote(self.id(), &symbol, ctx.funding, ctx.mark_px))
            })
            .collect())
    }

    async fn fetch_history(
        &self,
        symbol: &Symbol,
        count: usize,
    ) -> Result<Vec<HistoryPoint>, FetchError> {
        let start = Utc::now() - Duration::hours(HISTORY_LOOKBACK_HOURS);
        let entries: Vec<FundingEntry> = self
            .client
            .post(
                "/info",
                &json!({
                    "type": "fundingHistory",
                    "coin": symbol.base(),
                    "startTime": start.timestamp_millis(),
                }),
            )
            .await?;

        Ok(history(
            entries.into_iter().map(|e| (e.funding_rate, e.time)),
            count,
        ))
    }
}
