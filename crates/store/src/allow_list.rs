//! Withdrawal allow-list backed by one text file per exchange.
//!
//! An external job writes `withdrawable_{exchange}.txt` with one asset per line.
//! Entries are normalized to canonical symbols so `BTC`, `BTC_USDT` and
//! `BTCUSDT` all match the same instrument.

use async_trait::async_trait;
use funding_arb_core::{Exchange, Symbol, WithdrawalAllowList};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileAllowList {
    directory: PathBuf,
}

impl FileAllowList {
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    #[must_use]
    pub fn path_for(&self, exchange: Exchange) -> PathBuf {
        self.directory
            .join(format!("withdrawable_{}.txt", exchange.key()))
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

/// Parses allow-list file content into canonical symbols.
#[must_use]
pub fn parse_allow_list(content: &str) -> HashSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(Symbol::normalize)
        .map(|symbol| symbol.as_str().to_string())
        .collect()
}

#[async_trait]
impl WithdrawalAllowList for FileAllowList {
    async fn withdrawable(&self, exchange: Exchange) -> Option<HashSet<String>> {
        let path = self.path_for(exchange);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read allow-list");
                return None;
            }
        };

        let entries = parse_allow_list(&content);
        // an empty file carries no information
        if entries.is_empty() {
            None
        } else {
            Some(entries)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_normalizes_entries() {
        let entries = parse_allow_list("btc\nETH_USDT\n\n  SOLUSDT  \n");
        assert_eq!(entries.len(), 3);
        assert!(entries.contains("BTCUSDT"));
        assert!(entries.contains("ETHUSDT"));
        assert!(entries.contains("SOLUSDT"));
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let list = FileAllowList::new(dir.path());
        assert!(list.withdrawable(Exchange::Bybit).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_directory_is_none() {
        let list = FileAllowList::new("/nonexistent/withdrawals");
        assert!(list.withdrawable(Exchange::Okx).await.is_none());
    }

    #[tokio::test]
    async fn test_empty_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("withdrawable_mexc.txt"), "\n  \n").unwrap();

        let list = FileAllowList::new(dir.path());
        assert!(list.withdrawable(Exchange::Mexc).await.is_none());
    }

    #[tokio::test]
    async fn test_unreadable_path_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        // a directory where the file should be
        fs::create_dir(dir.path().join("withdrawable_kcex.txt")).unwrap();

        let list = FileAllowList::new(dir.path());
        assert!(list.withdrawable(Exchange::Kcex).await.is_none());
    }

    #[tokio::test]
    async fn test_reads_per_exchange_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("withdrawable_gate.txt"), "DOGE\nPEPE\n").unwrap();

        let list = FileAllowList::new(dir.path());
        let gate = list.withdrawable(Exchange::Gate).await.unwrap();
        assert!(gate.contains("DOGEUSDT"));
        assert!(!gate.contains("BTCUSDT"));
        assert!(list.withdrawable(Exchange::Okx).await.is_none());
    }

    #[tokio::test]
    async fn test_file_changes_seen_on_next_read() {
        let dir = tempfile::tempdir().unwrap();
        let list = FileAllowList::new(dir.path());
        let path = list.path_for(Exchange::Bitget);

        fs::write(&path, "BTC\n").unwrap();
        assert!(!list.withdrawable(Exchange::Bitget).await.unwrap().contains("ETHUSDT"));

        fs::write(&path, "BTC\nETH\n").unwrap();
        assert!(list.withdrawable(Exchange::Bitget).await.unwrap().contains("ETHUSDT"));
    }
}
