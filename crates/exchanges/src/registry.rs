//! Table of enabled adapters, keyed by exchange.

use crate::client::{VenueClient, VenueClientConfig};
use crate::venues::{
    aevo::{self, AevoAdapter},
    bingx::{self, BingXAdapter},
    bitget::{self, BitgetAdapter},
    bybit::{self, BybitAdapter},
    contract_api::{self, ContractApiAdapter},
    gate::{self, GateAdapter},
    hyperliquid::{self, HyperliquidAdapter},
    kucoin::{self, KucoinAdapter},
    okx::{self, OkxAdapter},
};
use anyhow::{Context, Result};
use funding_arb_core::{Exchange, ExchangeAdapter, ExchangesConfig};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Returns the public API root of a venue.
#[must_use]
pub fn default_base_url(exchange: Exchange) -> &'static str {
    match exchange {
        Exchange::Aevo => aevo::DEFAULT_BASE_URL,
        Exchange::BingX => bingx::DEFAULT_BASE_URL,
        Exchange::Bitget => bitget::DEFAULT_BASE_URL,
        Exchange::Bybit => bybit::DEFAULT_BASE_URL,
        Exchange::Gate => gate::DEFAULT_BASE_URL,
        Exchange::Hyperliquid => hyperliquid::DEFAULT_BASE_URL,
        Exchange::Kcex => contract_api::KCEX_BASE_URL,
        Exchange::Kucoin => kucoin::DEFAULT_BASE_URL,
        Exchange::Mexc => contract_api::MEXC_BASE_URL,
        Exchange::Okx => okx::DEFAULT_BASE_URL,
    }
}

/// Builds the adapter for `exchange` on top of `client`.
#[must_use]
pub fn build_adapter(exchange: Exchange, client: VenueClient) -> Arc<dyn ExchangeAdapter> {
    match exchange {
        Exchange::Aevo => Arc::new(AevoAdapter::new(client)),
        Exchange::BingX => Arc::new(BingXAdapter::new(client)),
        Exchange::Bitget => Arc::new(BitgetAdapter::new(client)),
        Exchange::Bybit => Arc::new(BybitAdapter::new(client)),
        Exchange::Gate => Arc::new(GateAdapter::new(client)),
        Exchange::Hyperliquid => Arc::new(HyperliquidAdapter::new(client)),
        Exchange::Kcex => Arc::new(ContractApiAdapter::kcex(client)),
        Exchange::Kucoin => Arc::new(KucoinAdapter::new(client)),
        Exchange::Mexc => Arc::new(ContractApiAdapter::mexc(client)),
        Exchange::Okx => Arc::new(OkxAdapter::new(client)),
    }
}

/// Enabled adapters in exchange-name order.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<Exchange, Arc<dyn ExchangeAdapter>>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds one adapter per enabled exchange, each with its own client and limiter.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be constructed.
    pub fn from_config(config: &ExchangesConfig) -> Result<Self> {
        let mut registry = Self::new();
        for &exchange in &config.enabled {
            let client_config = VenueClientConfig::new(default_base_url(exchange))
                .with_exchanges_config(config);
            let client = VenueClient::new(client_config)
                .with_context(|| format!("Failed to build client for {exchange}"))?;
            registry.register(build_adapter(exchange, client));
        }

        tracing::info!(
            exchanges = ?registry.exchanges(),
            "Adapter registry ready"
        );
        Ok(registry)
    }

    /// Adds or replaces the adapter for its exchange.
    pub fn register(&mut self, adapter: Arc<dyn ExchangeAdapter>) {
        self.adapters.insert(adapter.id(), adapter);
    }

    #[must_use]
    pub fn get(&self, exchange: Exchange) -> Option<&Arc<dyn ExchangeAdapter>> {
        self.adapters.get(&exchange)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ExchangeAdapter>> {
        self.adapters.values()
    }

    #[must_use]
    pub fn exchanges(&self) -> Vec<Exchange> {
        self.adapters.keys().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("exchanges", &self.exchanges())
            .finish()
    }
}
