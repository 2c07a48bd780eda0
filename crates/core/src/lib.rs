pub mod config;
pub mod config_loader;
pub mod error;
pub mod symbol;
pub mod thresholds;
pub mod traits;
pub mod types;
pub mod universe;

pub use config::{
    AppConfig, DatabaseConfig, ExchangesConfig, ScannerConfig, TelegramConfig, WithdrawalsConfig,
};
pub use config_loader::ConfigLoader;
pub use error::{ConfigurationError, FetchError, NotifyError, StoreError};
pub use symbol::Symbol;
pub use thresholds::{RawThresholds, ThresholdField, Thresholds};
pub use traits::{CooldownStore, ExchangeAdapter, NotificationSink, SettingsStore, WithdrawalAllowList};
pub use types::{
    fraction_to_pct, timestamp_from_venue, Exchange, FetchMode, HistoryPoint, RateQuote, Severity,
    UnknownExchange,
};
pub use universe::{load_universe, parse_universe};
