//! Suppression Store Implementation

use crate::StorageError;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

/// Name of the table holding suppression windows
pub const SUPPRESSION_TABLE: &str = "alert_suppress";

/// A suppression window for one (rule, value) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionRecord {
    pub id: i64,
    pub rule_name: String,
    pub suppression_value: String,
    /// Epoch seconds; the record is active strictly before this instant
    pub expires_at: i64,
}

impl SuppressionRecord {
    /// Whether the window still covers `at`
    pub fn is_active(&self, at: i64) -> bool {
        at < self.expires_at
    }
}

/// SQLite-backed store of suppression windows
pub struct SuppressionStore {
    pool: SqlitePool,
}

impl SuppressionStore {
    /// Open the database at `path`, creating the file and schema if needed.
    ///
    /// `":memory:"` opens a private in-memory database.
    pub async fn connect(path: &str) -> Result<Self, StorageError> {
        let connection_error = |reason: String| StorageError::Connection {
            path: path.to_string(),
            reason,
        };

        let options = if path == ":memory:" {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| connection_error(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
        };

        // An in-memory database lives only as long as its connection
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| connection_error(e.to_string()))?;

        let store = Self { pool };
        store.bootstrap().await?;

        info!("Opened suppression store at {}", path);
        Ok(store)
    }

    /// Create the suppression table and its lookup index if they are missing
    pub async fn bootstrap(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS alert_suppress (
                id    INTEGER PRIMARY KEY AUTOINCREMENT,
                name  TEXT    NOT NULL,
                until INTEGER NOT NULL,
                value TEXT    NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_alert_suppress_key ON alert_suppress(name, value)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Check whether an active window exists for `rule_name` and `value` at `at`.
    ///
    /// An empty value never suppresses.
    pub async fn should_suppress(
        &self,
        rule_name: &str,
        value: &str,
        at: i64,
    ) -> Result<bool, StorageError> {
        if value.is_empty() {
            return Ok(false);
        }

        let hit = sqlx::query(
            "SELECT id FROM alert_suppress WHERE name = ? AND value = ? AND ? < until LIMIT 1",
        )
        .bind(rule_name)
        .bind(value)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        if hit.is_some() {
            debug!("'{}': value '{}' suppressed at {}", rule_name, value, at);
        }
        Ok(hit.is_some())
    }

    /// Insert a new suppression window, returning its id.
    ///
    /// Existing windows for the same key are left untouched.
    pub async fn add_suppression(
        &self,
        rule_name: &str,
        value: &str,
        expires_at: i64,
    ) -> Result<i64, StorageError> {
        let result = sqlx::query("INSERT INTO alert_suppress (name, value, until) VALUES (?, ?, ?)")
            .bind(rule_name)
            .bind(value)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        let id = result.last_insert_rowid();
        debug!(
            "'{}': suppressing value '{}' until {} (id {})",
            rule_name, value, expires_at, id
        );
        Ok(id)
    }

    /// Delete windows that expired more than one second before `now`
    pub async fn cleanup(&self, now: i64) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM alert_suppress WHERE until < ?")
            .bind(now - 1)
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected();
        if removed > 0 {
            debug!("Removed {} expired suppression(s)", removed);
        }
        Ok(removed)
    }

    /// All windows recorded for a rule, oldest first
    pub async fn records(&self, rule_name: &str) -> Result<Vec<SuppressionRecord>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, name, value, until FROM alert_suppress WHERE name = ? ORDER BY id",
        )
        .bind(rule_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| SuppressionRecord {
                id: row.get("id"),
                rule_name: row.get("name"),
                suppression_value: row.get("value"),
                expires_at: row.get("until"),
            })
            .collect())
    }

    /// Close the underlying pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
