use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use funding_arb_core::{
    CooldownStore, RawThresholds, SettingsStore, StoreError, Symbol, ThresholdField,
};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

fn db_err(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

/// `SQLite` storage for thresholds and cooldown entries.
///
/// Both tables live in one database file; migrations create the settings row
/// with default thresholds on first start.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database and runs migrations.
    ///
    /// # Arguments
    ///
    /// * `database_url` - `SQLite` URL (e.g., `sqlite://data/funding_arb.db`)
    /// * `max_connections` - Pool size
    ///
    /// # Errors
    ///
    /// Returns error if the parent directory cannot be created, the connection
    /// fails, or migrations fail.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        if let Some(parent) = database_file(database_url).and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(db_err)?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(db_err)?;

        Self::migrate(pool).await
    }

    /// Creates an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns error if connection or migrations fail.
    pub async fn new_in_memory() -> Result<Self, StoreError> {
        // each connection to sqlite::memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(db_err)?;

        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Database(format!("migration failed: {e}")))?;

        Ok(Self { pool })
    }
}

/// Extracts the file path from a `sqlite:` URL, if it names one.
fn database_file(url: &str) -> Option<&Path> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(Path::new(path))
    }
}

fn parse_decimal(column: &'static str, raw: Option<String>) -> Result<Option<Decimal>, StoreError> {
    raw.map(|value| {
        Decimal::from_str(value.trim()).map_err(|_| StoreError::Corrupt { column, value })
    })
    .transpose()
}

fn from_millis(column: &'static str, millis: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| StoreError::Corrupt {
            column,
            value: millis.to_string(),
        })
}

#[async_trait]
impl SettingsStore for SqliteStore {
    async fn load(&self) -> Result<RawThresholds, StoreError> {
        let row = sqlx::query_as::<_, (Option<String>, Option<String>, Option<String>, Option<String>)>(
            "SELECT spread_low, spread_medium, spread_high, price_diff FROM settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let Some((low, medium, high, divergence)) = row else {
            return Ok(RawThresholds::default());
        };

        Ok(RawThresholds {
            spread_low: parse_decimal("spread_low", low)?,
            spread_medium: parse_decimal("spread_medium", medium)?,
            spread_high: parse_decimal("spread_high", high)?,
            max_price_divergence_pct: parse_decimal("price_diff", divergence)?,
        })
    }

    async fn update(&self, field: ThresholdField, value: Decimal) -> Result<(), StoreError> {
        // column names come from a closed enum
        let column = field.as_str();
        let sql = format!(
            "INSERT INTO settings (id, {column}, updated_at) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET {column} = excluded.{column}, updated_at = excluded.updated_at"
        );

        sqlx::query(&sql)
            .bind(value.to_string())
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        tracing::info!(field = column, %value, "Threshold updated");
        Ok(())
    }
}

#[async_trait]
impl CooldownStore for SqliteStore {
    async fn put(&self, symbol: &Symbol, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO cooldowns (symbol, expires_at)
            VALUES (?1, ?2)
            ON CONFLICT(symbol) DO UPDATE SET expires_at = excluded.expires_at
            ",
        )
        .bind(symbol.as_str())
        .bind(expires_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM cooldowns WHERE expires_at <= ?1")
            .bind(now.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected())
    }

    async fn list_active(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<(Symbol, DateTime<Utc>)>, StoreError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT symbol, expires_at FROM cooldowns WHERE expires_at > ?1 ORDER BY expires_at",
        )
        .bind(now.timestamp_millis())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(|(raw, millis)| {
                let symbol = Symbol::normalize(&raw).ok_or(StoreError::Corrupt {
                    column: "symbol",
                    value: raw,
                })?;
                Ok((symbol, from_millis("expires_at", millis)?))
            })
            .collect()
    }

    async fn expires_at(&self, symbol: &Symbol) -> Result<Option<DateTime<Utc>>, StoreError> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT expires_at FROM cooldowns WHERE symbol = ?1")
            .bind(symbol.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(|(millis,)| from_millis("expires_at", millis))
            .transpose()
    }

    async fn remove(&self, symbol: &Symbol) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM cooldowns WHERE symbol = ?1")
            .bind(symbol.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }
}
