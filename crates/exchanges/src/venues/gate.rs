use crate::client::VenueClient;
use crate::de::{opt_decimal, opt_timestamp};
use crate::venues::{history, quote};
use async_trait::async_trait;
use funding_arb_core::{Exchange, ExchangeAdapter, FetchError, HistoryPoint, RateQuote, Symbol};
use rust_decimal::Decimal;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.gateio.ws";

/// Label Gate returns (with HTTP 400) for unknown contracts.
const CONTRACT_NOT_FOUND: &str = "CONTRACT_NOT_FOUND";

#[derive(Debug, Deserialize)]
struct Contract {
    #[serde(default, deserialize_with = "opt_decimal")]
    funding_rate_indicative: Option<Decimal>,
    #[serde(default, deserialize_with = "opt_decimal")]
    index_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct FundingEntry {
    #[serde(default, deserialize_with = "opt_decimal")]
    r: Option<Decimal>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    t: Option<i64>,
}

/// Gate.io USDT-settled perpetuals.
pub struct GateAdapter {
    client: VenueClient,
}

impl GateAdapter {
    #[must_use]
    pub fn new(client: VenueClient) -> Self {
        Self { client }
    }
}

fn not_found_as_unsupported(err: FetchError) -> FetchError {
    match err {
        FetchError::Transient(msg) if msg.contains(CONTRACT_NOT_FOUND) => {
            FetchError::Unsupported(msg)
        }
        other => other,
    }
}

#[async_trait]
impl ExchangeAdapter for GateAdapter {
    fn id(&self) -> Exchange {
        Exchange::Gate
    }

    async fn fetch_current(&self, symbol: &Symbol) -> Result<RateQuote, FetchError> {
        let contract: Contract = self
            .client
            .get(
                &format!("/api/v4/futures/usdt/contracts/{}", symbol.joined("_")),
                &[],
            )
            .await
            .map_err(not_found_as_unsupported)?;

        if contract.funding_rate_indicative.is_none() && contract.index_price.is_none() {
            return Err(FetchError::unsupported(format!("{symbol} has no funding data")));
        }

        Ok(quote(
            self.id(),
            symbol,
            contract.funding_rate_indicative,
            contract.index_price,
        ))
    }

    async fn fetch_history(
        &self,
        symbol: &Symbol,
        count: usize,
    ) -> Result<Vec<HistoryPoint>, FetchError> {
        let entries: Vec<FundingEntry> = self
            .client
            .get(
                "/api/v4/futures/usdt/funding_rate",
                &[
                    ("contract", symbol.joined("_")),
                    ("limit", count.to_string()),
                ],
            )
            .await
            .map_err(not_found_as_unsupported)?;

        Ok(history(entries.into_iter().map(|e| (e.r, e.t)), count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::VenueClientConfig;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn adapter(server: &MockServer) -> GateAdapter {
        GateAdapter::new(VenueClient::new(VenueClientConfig::new(server.uri())).unwrap())
    }

    #[tokio::test]
    async fn test_fetch_current_uses_underscore_contract() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v4/futures/usdt/contracts/SOL_USDT"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"name":"SOL_USDT","funding_rate_indicative":"0.0002","index_price":"145.12","mark_price":"145.2"}"#,
            ))
            .mount(&server)
            .await;

        let symbol = Symbol::normalize("SOLUSDT").unwrap();
        let quote = adapter(&server).await.fetch_current(&symbol).await.unwrap();

        assert_eq!(quote.exchange, Exchange::Gate);
        assert_eq!(quote.funding_rate_pct, Some(dec!(0.02)));
        assert_eq!(quote.price, Some(dec!(145.12)));
    }

    #[tokio::test]
    async fn test_unknown_contract_is_unsupported() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v4/futures/usdt/contracts/NOPE_USDT"))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                r#"{"label":"CONTRACT_NOT_FOUND","message":"Contract not found"}"#,
            ))
            .mount(&server)
            .await;

        let symbol = Symbol::normalize("NOPEUSDT").unwrap();
        let err = adapter(&server).await.fetch_current(&symbol).await.unwrap_err();
        assert!(err.is_unsupported());
    }

    #[tokio::test]
    async fn test_server_error_stays_transient() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v4/futures/usdt/contracts/BTC_USDT"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let symbol = Symbol::normalize("BTCUSDT").unwrap();
        let err = adapter(&server).await.fetch_current(&symbol).await.unwrap_err();
        assert!(matches!(err, FetchError::Transient(_)));
    }

    #[tokio::test]
    async fn test_fetch_history_second_timestamps() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v4/futures/usdt/funding_rate"))
            .and(query_param("contract", "BTC_USDT"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"t":1700028800,"r":"0.0001"},{"t":1700000000,"r":"-0.00003"}]"#,
            ))
            .mount(&server)
            .await;

        let symbol = Symbol::normalize("BTCUSDT").unwrap();
        let points = adapter(&server).await.fetch_history(&symbol, 4).await.unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].settled_at.timestamp(), 1_700_028_800);
        assert_eq!(points[1].funding_rate_pct, dec!(-0.003));
    }
}
