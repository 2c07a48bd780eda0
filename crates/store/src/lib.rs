//! Storage for the funding-rate arbitrage scanner.
//!
//! - [`SqliteStore`]: thresholds and cooldown entries in `SQLite`
//! - [`MemorySettingsStore`] / [`MemoryCooldownStore`]: process-local variants
//! - [`FileAllowList`]: per-exchange withdrawal allow-lists

pub mod allow_list;
pub mod memory;
pub mod sqlite;

pub use allow_list::{parse_allow_list, FileAllowList};
pub use memory::{MemoryCooldownStore, MemorySettingsStore};
pub use sqlite::SqliteStore;
