//! Telegram Bot API sink.

use async_trait::async_trait;
use funding_arb_core::{NotificationSink, NotifyError, Severity, TelegramConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Forum thread per severity tier. `None` posts to the chat root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierThreads {
    pub low: Option<i64>,
    pub medium: Option<i64>,
    pub high: Option<i64>,
}

impl TierThreads {
    #[must_use]
    pub fn for_severity(&self, severity: Severity) -> Option<i64> {
        match severity {
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_thread_id: Option<i64>,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
}

/// Sends alerts through `sendMessage`.
#[derive(Clone)]
pub struct TelegramSink {
    http: reqwest::Client,
    endpoint: String,
    chat_id: i64,
    threads: TierThreads,
}

impl TelegramSink {
    /// Creates a sink posting to `{api_url}/bot{token}/sendMessage`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(
        api_url: &str,
        bot_token: &str,
        chat_id: i64,
        threads: TierThreads,
    ) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Delivery(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                api_url.trim_end_matches('/'),
                bot_token
            ),
            chat_id,
            threads,
        })
    }

    /// Builds the sink from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::NotConfigured`] if the token or chat id is missing.
    pub fn from_config(config: &TelegramConfig) -> Result<Self, NotifyError> {
        let token = config
            .bot_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(NotifyError::NotConfigured("telegram.bot_token"))?;
        let chat_id = config
            .chat_id
            .ok_or(NotifyError::NotConfigured("telegram.chat_id"))?;

        Self::new(
            &config.api_url,
            token,
            chat_id,
            TierThreads {
                low: config.low_thread_id,
                medium: config.medium_thread_id,
                high: config.high_thread_id,
            },
        )
    }

    #[must_use]
    pub fn threads(&self) -> TierThreads {
        self.threads
    }
}

impl std::fmt::Debug for TelegramSink {
    // the endpoint embeds the bot token
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSink")
            .field("chat_id", &self.chat_id)
            .field("threads", &self.threads)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    #[instrument(skip(self, html), fields(severity = severity.as_str()), level = "debug")]
    async fn send(&self, severity: Severity, html: &str) -> Result<(), NotifyError> {
        let body = SendMessage {
            chat_id: self.chat_id,
            message_thread_id: self.threads.for_severity(severity),
            text: html,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            // reqwest errors can carry the URL, which holds the token
            .map_err(|e| NotifyError::Delivery(e.without_url().to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| NotifyError::Delivery(e.without_url().to_string()))?;

        let parsed: Option<ApiResponse> = serde_json::from_str(&text).ok();
        match parsed {
            Some(api) if api.ok && status.is_success() => {
                debug!(thread = ?body.message_thread_id, "Telegram message delivered");
                Ok(())
            }
            Some(api) => Err(NotifyError::Rejected {
                status: api.error_code.unwrap_or(status.as_u16()),
                message: api.description.unwrap_or_else(|| "no description".to_string()),
            }),
            None => Err(NotifyError::Rejected {
                status: status.as_u16(),
                message: text.chars().take(200).collect(),
            }),
        }
    }
}
