use crate::types::Exchange;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scanner: ScannerConfig,
    pub exchanges: ExchangesConfig,
    pub database: DatabaseConfig,
    pub telegram: TelegramConfig,
    pub withdrawals: WithdrawalsConfig,
}

/// Polling cycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Newline-delimited list of tracked symbols.
    pub universe_path: PathBuf,
    /// Symbols fetched concurrently per exchange.
    pub batch_size: usize,
    /// Pause between batches of the same exchange.
    pub inter_batch_delay_ms: u64,
    /// Pause between completed cycles.
    pub cycle_pause_secs: u64,
    /// Pause after a failed cycle.
    pub error_pause_secs: u64,
    pub cooldown_minutes: i64,
    /// Settled funding rates shown per exchange in an alert.
    pub history_depth: usize,
    /// Exchanges every row must carry; empty keeps partial rows.
    pub required_exchanges: Vec<Exchange>,
    /// Quotes older than this are treated as absent. `None` disables the guard.
    pub max_quote_age_secs: Option<u64>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            universe_path: PathBuf::from("config/coins.txt"),
            batch_size: 20,
            inter_batch_delay_ms: 2_000,
            cycle_pause_secs: 5,
            error_pause_secs: 5,
            cooldown_minutes: 40,
            history_depth: 4,
            required_exchanges: Vec::new(),
            max_quote_age_secs: Some(120),
        }
    }
}

impl ScannerConfig {
    #[must_use]
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    #[must_use]
    pub fn cycle_pause(&self) -> Duration {
        Duration::from_secs(self.cycle_pause_secs)
    }

    #[must_use]
    pub fn error_pause(&self) -> Duration {
        Duration::from_secs(self.error_pause_secs)
    }

    #[must_use]
    pub fn cooldown_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cooldown_minutes)
    }

    #[must_use]
    pub fn max_quote_age(&self) -> Option<chrono::Duration> {
        self.max_quote_age_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .map(chrono::Duration::seconds)
    }
}

/// Venue selection and HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangesConfig {
    pub enabled: Vec<Exchange>,
    pub request_timeout_secs: u64,
    /// Per-exchange request budget.
    pub requests_per_second: u32,
    /// Venues flagged as high risk in alerts.
    pub risky: Vec<Exchange>,
}

impl Default for ExchangesConfig {
    fn default() -> Self {
        Self {
            enabled: Exchange::ALL.to_vec(),
            request_timeout_secs: 10,
            requests_per_second: 20,
            risky: Vec::new(),
        }
    }
}

impl ExchangesConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/funding_arb.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

/// Telegram Bot API delivery.
///
/// Each severity tier posts into its own forum thread of one chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// When false alerts are only logged.
    pub enabled: bool,
    pub api_url: String,
    pub bot_token: Option<String>,
    pub chat_id: Option<i64>,
    pub low_thread_id: Option<i64>,
    pub medium_thread_id: Option<i64>,
    pub high_thread_id: Option<i64>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: "https://api.telegram.org".to_string(),
            bot_token: None,
            chat_id: None,
            low_thread_id: Some(265),
            medium_thread_id: Some(267),
            high_thread_id: Some(269),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WithdrawalsConfig {
    /// Directory holding `withdrawable_{exchange}.txt` files.
    pub directory: PathBuf,
}

impl Default for WithdrawalsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("data/withdrawals"),
        }
    }
}
