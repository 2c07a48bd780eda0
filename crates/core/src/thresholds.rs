//! Spread and price-divergence thresholds.
//!
//! Thresholds live in an operator-editable settings store. Each cycle reads a
//! [`RawThresholds`] snapshot and validates it into [`Thresholds`]; an invalid
//! snapshot blocks qualification for that cycle instead of defaulting to zero.

use crate::error::ConfigurationError;
use crate::types::Severity;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Threshold values as stored; any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawThresholds {
    pub spread_low: Option<Decimal>,
    pub spread_medium: Option<Decimal>,
    pub spread_high: Option<Decimal>,
    pub max_price_divergence_pct: Option<Decimal>,
}

impl RawThresholds {
    /// Validates the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if any field is missing, negative, or the
    /// tiers are not ordered.
    pub fn validate(&self) -> Result<Thresholds, ConfigurationError> {
        let spread_low = require(ThresholdField::SpreadLow, self.spread_low)?;
        let spread_medium = require(ThresholdField::SpreadMedium, self.spread_medium)?;
        let spread_high = require(ThresholdField::SpreadHigh, self.spread_high)?;
        let max_price_divergence_pct =
            require(ThresholdField::MaxPriceDivergence, self.max_price_divergence_pct)?;

        if !(spread_low <= spread_medium && spread_medium <= spread_high) {
            return Err(ConfigurationError::Unordered {
                low: spread_low.to_string(),
                medium: spread_medium.to_string(),
                high: spread_high.to_string(),
            });
        }

        Ok(Thresholds {
            spread_low,
            spread_medium,
            spread_high,
            max_price_divergence_pct,
        })
    }

    /// Returns a copy with one field replaced.
    #[must_use]
    pub fn with_field(mut self, field: ThresholdField, value: Decimal) -> Self {
        match field {
            ThresholdField::SpreadLow => self.spread_low = Some(value),
            ThresholdField::SpreadMedium => self.spread_medium = Some(value),
            ThresholdField::SpreadHigh => self.spread_high = Some(value),
            ThresholdField::MaxPriceDivergence => self.max_price_divergence_pct = Some(value),
        }
        self
    }
}

impl From<Thresholds> for RawThresholds {
    fn from(t: Thresholds) -> Self {
        Self {
            spread_low: Some(t.spread_low),
            spread_medium: Some(t.spread_medium),
            spread_high: Some(t.spread_high),
            max_price_divergence_pct: Some(t.max_price_divergence_pct),
        }
    }
}

fn require(field: ThresholdField, value: Option<Decimal>) -> Result<Decimal, ConfigurationError> {
    let value = value.ok_or(ConfigurationError::Missing(field.as_str()))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ConfigurationError::Negative {
            field: field.as_str(),
            value: value.to_string(),
        });
    }
    Ok(value)
}

/// A validated threshold snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Spreads must exceed this to qualify (percentage points).
    pub spread_low: Decimal,
    pub spread_medium: Decimal,
    pub spread_high: Decimal,
    /// Maximum tolerated price divergence between the two venues, in percent.
    pub max_price_divergence_pct: Decimal,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            spread_low: dec!(0.3),
            spread_medium: dec!(0.7),
            spread_high: dec!(1.0),
            max_price_divergence_pct: dec!(1.0),
        }
    }
}

impl Thresholds {
    /// Returns true if a pair with this spread and divergence qualifies.
    #[must_use]
    pub fn qualifies(&self, spread: Decimal, divergence_pct: Decimal) -> bool {
        spread > self.spread_low && divergence_pct <= self.max_price_divergence_pct
    }

    /// Classifies a spread into its alert tier.
    ///
    /// Returns `None` below `spread_low`.
    #[must_use]
    pub fn classify(&self, spread: Decimal) -> Option<Severity> {
        if spread >= self.spread_high {
            Some(Severity::High)
        } else if spread >= self.spread_medium {
            Some(Severity::Medium)
        } else if spread >= self.spread_low {
            Some(Severity::Low)
        } else {
            None
        }
    }
}

/// Names of the operator-editable threshold fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThresholdField {
    SpreadLow,
    SpreadMedium,
    SpreadHigh,
    MaxPriceDivergence,
}

impl ThresholdField {
    pub const ALL: [ThresholdField; 4] = [
        Self::SpreadLow,
        Self::SpreadMedium,
        Self::SpreadHigh,
        Self::MaxPriceDivergence,
    ];

    /// Returns the storage/column name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SpreadLow => "spread_low",
            Self::SpreadMedium => "spread_medium",
            Self::SpreadHigh => "spread_high",
            Self::MaxPriceDivergence => "price_diff",
        }
    }
}

impl fmt::Display for ThresholdField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ThresholdField {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spread_low" | "low" => Ok(Self::SpreadLow),
            "spread_medium" | "medium" => Ok(Self::SpreadMedium),
            "spread_high" | "high" => Ok(Self::SpreadHigh),
            "price_diff" | "max_price_divergence" | "divergence" => Ok(Self::MaxPriceDivergence),
            other => Err(ConfigurationError::UnknownField(other.to_string())),
        }
    }
}
