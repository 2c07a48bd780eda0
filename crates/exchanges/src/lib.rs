//! Venue adapters for the funding-rate arbitrage scanner.
//!
//! Every adapter implements [`funding_arb_core::ExchangeAdapter`] over a
//! rate-limited [`VenueClient`]. [`AdapterRegistry`] builds the enabled set
//! from configuration.

pub mod client;
pub mod de;
pub mod registry;
pub mod venues;

pub use client::{VenueClient, VenueClientConfig};
pub use registry::{build_adapter, default_base_url, AdapterRegistry};
pub use venues::{
    aevo::AevoAdapter, bingx::BingXAdapter, bitget::BitgetAdapter, bybit::BybitAdapter,
    contract_api::ContractApiAdapter, gate::GateAdapter, hyperliquid::HyperliquidAdapter,
    kucoin::KucoinAdapter, okx::OkxAdapter,
};
