//! The tracked symbol universe.

use crate::symbol::Symbol;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;

/// Parses newline-delimited symbols.
///
/// Blank lines and `#` comments are skipped; entries are normalized and
/// de-duplicated keeping the first occurrence.
#[must_use]
pub fn parse_universe(contents: &str) -> Vec<Symbol> {
    let mut seen = HashSet::new();
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let symbol = Symbol::normalize(line);
            if symbol.is_none() {
                tracing::warn!(line, "Skipping unparseable universe entry");
            }
            symbol
        })
        .filter(|symbol| seen.insert(symbol.clone()))
        .collect()
}

/// Reads the universe file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub async fn load_universe(path: &Path) -> Result<Vec<Symbol>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read universe file {}", path.display()))?;
    Ok(parse_universe(&contents))
}
