//! Process-local stores for tests and `--ephemeral` runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use funding_arb_core::{
    CooldownStore, RawThresholds, SettingsStore, StoreError, Symbol, ThresholdField, Thresholds,
};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Thresholds held in memory.
#[derive(Debug)]
pub struct MemorySettingsStore {
    raw: RwLock<RawThresholds>,
}

impl MemorySettingsStore {
    #[must_use]
    pub fn new(raw: RawThresholds) -> Self {
        Self {
            raw: RwLock::new(raw),
        }
    }
}

impl Default for MemorySettingsStore {
    fn default() -> Self {
        Self::new(Thresholds::default().into())
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<RawThresholds, StoreError> {
        Ok(self.raw.read().clone())
    }

    async fn update(&self, field: ThresholdField, value: Decimal) -> Result<(), StoreError> {
        let mut raw = self.raw.write();
        *raw = raw.clone().with_field(field, value);
        Ok(())
    }
}

/// Cooldown entries held in memory.
#[derive(Debug, Default)]
pub struct MemoryCooldownStore {
    entries: RwLock<HashMap<Symbol, DateTime<Utc>>>,
}

impl MemoryCooldownStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CooldownStore for MemoryCooldownStore {
    async fn put(&self, symbol: &Symbol, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.entries.write().insert(symbol.clone(), expires_at);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        Ok((before - entries.len()) as u64)
    }

    async fn list_active(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<(Symbol, DateTime<Utc>)>, StoreError> {
        let mut active: Vec<_> = self
            .entries
            .read()
            .iter()
            .filter(|(_, expires_at)| **expires_at > now)
            .map(|(symbol, expires_at)| (symbol.clone(), *expires_at))
            .collect();
        active.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        Ok(active)
    }

    async fn expires_at(&self, symbol: &Symbol) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.entries.read().get(symbol).copied())
    }

    async fn remove(&self, symbol: &Symbol) -> Result<bool, StoreError> {
        Ok(self.entries.write().remove(symbol).is_some())
    }
}
