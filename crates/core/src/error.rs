//! Error types shared across the scanner.
//!
//! Adapter failures are contained at the adapter boundary as [`FetchError`];
//! they never cross into the join or the detector as anything other than a
//! missing quote.

use thiserror::Error;

/// Failure of a single adapter call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The venue does not list the instrument or funding does not apply.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Network failure, timeout, or non-2xx response.
    #[error("transient error: {0}")]
    Transient(String),

    /// Response payload did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Creates an unsupported error.
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::Unsupported(reason.into())
    }

    /// Creates a transient error.
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient(reason.into())
    }

    /// Creates a malformed-response error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }

    /// Returns true for expected, non-alarming failures.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }

    /// Returns true if the call may succeed on a later cycle.
    ///
    /// Malformed payloads propagate exactly like transient failures.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Malformed(_))
    }
}

/// Threshold configuration is missing or inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A threshold has no value.
    #[error("threshold `{0}` is not set")]
    Missing(&'static str),

    /// A threshold is negative.
    #[error("threshold `{field}` must be non-negative, got {value}")]
    Negative {
        field: &'static str,
        value: String,
    },

    /// Tier thresholds are not ordered low <= medium <= high.
    #[error("spread tiers must satisfy low <= medium <= high (got {low} / {medium} / {high})")]
    Unordered {
        low: String,
        medium: String,
        high: String,
    },

    /// A named field does not exist.
    #[error("unknown threshold field: {0}")]
    UnknownField(String),
}

/// Persistence failure in a settings or cooldown store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("corrupt value in column `{column}`: {value}")]
    Corrupt { column: &'static str, value: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to deliver one notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("channel rejected message: {status} - {message}")]
    Rejected { status: u16, message: String },

    #[error("channel for `{0}` alerts is not configured")]
    NotConfigured(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_classification() {
        assert!(FetchError::unsupported("no such contract").is_unsupported());
        assert!(!FetchError::unsupported("no such contract").is_transient());
        assert!(FetchError::transient("timeout").is_transient());
        assert!(FetchError::malformed("missing field").is_transient());
        assert!(!FetchError::malformed("missing field").is_unsupported());
    }

    #[test]
    fn test_error_display() {
        let err = FetchError::transient("HTTP 502");
        assert!(err.to_string().contains("502"));

        let err = ConfigurationError::Missing("spread_low");
        assert!(err.to_string().contains("spread_low"));

        let err = NotifyError::Rejected {
            status: 400,
            message: "chat not found".to_string(),
        };
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("chat not found"));
    }
}
