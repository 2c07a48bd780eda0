//! Rate-limited HTTP client shared by every venue adapter.
//!
//! Each adapter owns one [`VenueClient`]: a reqwest client with a request
//! timeout, a governor limiter sized to the venue's public quota, and a base
//! URL that tests point at a mock server.

use anyhow::{Context, Result};
use funding_arb_core::{ExchangesConfig, FetchError};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

const USER_AGENT: &str = concat!("funding-arb/", env!("CARGO_PKG_VERSION"));

/// Error bodies longer than this are cut in log output.
const MAX_ERROR_BODY: usize = 200;

// 1200 requests per minute = 20 per second
const DEFAULT_REQUESTS_PER_SECOND: NonZeroU32 = match NonZeroU32::new(20) {
    Some(n) => n,
    None => NonZeroU32::MIN,
};

/// Connection settings for one venue.
#[derive(Debug, Clone)]
pub struct VenueClientConfig {
    pub base_url: String,
    pub requests_per_second: NonZeroU32,
    pub timeout: Duration,
}

impl VenueClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            timeout: Duration::from_secs(10),
        }
    }

    /// Applies the shared timeout and rate limit from configuration.
    #[must_use]
    pub fn with_exchanges_config(mut self, config: &ExchangesConfig) -> Self {
        self.timeout = config.request_timeout();
        if let Some(rps) = NonZeroU32::new(config.requests_per_second) {
            self.requests_per_second = rps;
        }
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the rate limit.
    #[must_use]
    pub fn with_rate_limit(mut self, requests_per_second: NonZeroU32) -> Self {
        self.requests_per_second = requests_per_second;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Clone)]
pub struct VenueClient {
    http: Client,
    base_url: String,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl VenueClient {
    /// Builds a client from its configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(config: VenueClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        let quota = Quota::per_second(config.requests_per_second);

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Waits for the rate limiter and performs a GET request.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transient`] for network failures and non-2xx
    /// statuses, [`FetchError::Unsupported`] for 404, and
    /// [`FetchError::Malformed`] if the body does not decode into `T`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
            .map_err(transport_error)?;

        handle_response(response).await
    }

    /// Waits for the rate limiter and performs a JSON POST request.
    ///
    /// # Errors
    ///
    /// Same as [`VenueClient::get`].
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, FetchError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        handle_response(response).await
    }
}

fn transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::transient(format!("request timed out: {err}"))
    } else {
        FetchError::transient(format!("network error: {err}"))
    }
}

async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, FetchError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if status == StatusCode::NOT_FOUND {
        return Err(FetchError::unsupported(format!(
            "HTTP 404: {}",
            truncate(&body)
        )));
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::transient("rate limited (HTTP 429)"));
    }

    if !status.is_success() {
        return Err(FetchError::transient(format!(
            "HTTP {}: {}",
            status.as_u16(),
            truncate(&body)
        )));
    }

    serde_json::from_str(&body)
        .map_err(|e| FetchError::malformed(format!("{e}: {}", truncate(&body))))
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
