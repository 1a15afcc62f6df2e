use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use super::{CalculationRecord, HealthStatus, HistoryStore, NewCalculation, StorageError};
use crate::{calc::Operation, config::DatabaseConfig};

/// SQLite-backed history, one row per computation.
#[derive(Debug, Clone)]
pub struct SqliteHistoryStore {
    pool: SqlitePool,
    db_name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct CalculationRow {
    id: i64,
    operation: String,
    num1: f64,
    num2: Option<f64>,
    result: Option<f64>,
    timestamp: String,
}

impl SqliteHistoryStore {
    /// Open (creating if missing) the database file and run migrations.
    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory {}", parent.display())
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database {}", config.path.display()))?;

        let store = Self::from_pool(pool, config.name.clone());
        store
            .migrate()
            .await
            .context("Failed to run database migrations")?;

        tracing::info!(db = %config.name, path = %config.path.display(), "Connected to database");
        Ok(store)
    }

    /// Wrap an existing pool. Migrations are not run.
    pub fn from_pool(pool: SqlitePool, db_name: impl Into<String>) -> Self {
        Self {
            pool,
            db_name: db_name.into(),
        }
    }

    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(id: i64, raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt {
            id,
            reason: format!("bad timestamp {raw:?}: {e}"),
        })
}

impl TryFrom<CalculationRow> for CalculationRecord {
    type Error = StorageError;

    fn try_from(row: CalculationRow) -> Result<Self, Self::Error> {
        let operation = row.operation.parse::<Operation>().map_err(|e| StorageError::Corrupt {
            id: row.id,
            reason: format!("{e}"),
        })?;

        let timestamp = decode_timestamp(row.id, &row.timestamp)?;

        Ok(CalculationRecord {
            id: row.id,
            operation,
            num1: row.num1,
            num2: row.num2,
            // SQLite stores NaN as NULL.
            result: row.result.unwrap_or(f64::NAN),
            timestamp,
        })
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn append(&self, calc: NewCalculation) -> Result<CalculationRecord, StorageError> {
        let result = (!calc.result.is_nan()).then_some(calc.result);

        // Never stamp a row earlier than the newest one, even if the clock steps back.
        let (id, stamped): (i64, String) = sqlx::query_as(
            r#"
            INSERT INTO calculations (operation, num1, num2, result, timestamp)
            VALUES (?, ?, ?, ?, MAX(?, COALESCE((SELECT MAX(timestamp) FROM calculations), '')))
            RETURNING id, timestamp
            "#,
        )
        .bind(calc.operation.as_str())
        .bind(calc.num1)
        .bind(calc.num2)
        .bind(result)
        .bind(encode_timestamp(&Utc::now()))
        .fetch_one(&self.pool)
        .await?;

        let timestamp = decode_timestamp(id, &stamped)?;

        Ok(CalculationRecord {
            id,
            operation: calc.operation,
            num1: calc.num1,
            num2: calc.num2,
            result: calc.result,
            timestamp,
        })
    }

    async fn recent(&self, limit: u32) -> Result<Vec<CalculationRecord>, StorageError> {
        let rows = sqlx::query_as::<_, CalculationRow>(
            r#"
            SELECT id, operation, num1, num2, result, timestamp
            FROM calculations
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CalculationRecord::try_from).collect()
    }

    async fn health_status(&self) -> Result<HealthStatus, StorageError> {
        if let Err(e) = sqlx::query("SELECT 1").execute(&self.pool).await {
            tracing::warn!(db = %self.db_name, error = %e, "Database ping failed");
            return Ok(HealthStatus {
                connected: false,
                db_name: self.db_name.clone(),
                collection_count: 0,
            });
        }

        let (tables,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
              AND name != '_sqlx_migrations'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(HealthStatus {
            connected: true,
            db_name: self.db_name.clone(),
            collection_count: usize::try_from(tables).unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, time::Duration};
    use tempfile::TempDir;

    async fn open_store(dir: &TempDir) -> SqliteHistoryStore {
        open_store_with(dir, 2).await
    }

    async fn open_store_with(dir: &TempDir, max_connections: u32) -> SqliteHistoryStore {
        let config = DatabaseConfig {
            name: "calculator".to_string(),
            path: dir.path().join("nested").join("calculator.db"),
            max_connections,
            acquire_timeout: Duration::from_secs(5),
        };
        SqliteHistoryStore::connect(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_empty_store_returns_no_history() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        let history = store.recent(100).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_append_and_read_back() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        let saved = store
            .append(NewCalculation::new(Operation::Divide, 9.0, Some(3.0), 3.0))
            .await
            .unwrap();

        let history = store.recent(100).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, saved.id);
        assert_eq!(history[0].operation, Operation::Divide);
        assert_eq!(history[0].num1, 9.0);
        assert_eq!(history[0].num2, Some(3.0));
        assert_eq!(history[0].result, 3.0);
        assert_eq!(
            history[0].timestamp.timestamp_micros(),
            saved.timestamp.timestamp_micros()
        );
    }

    #[tokio::test]
    async fn test_recent_is_newest_first_and_capped() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        for i in 0..120_i32 {
            store
                .append(NewCalculation::new(Operation::Add, f64::from(i), Some(1.0), f64::from(i + 1)))
                .await
                .unwrap();
        }

        let history = store.recent(100).await.unwrap();
        assert_eq!(history.len(), 100);
        assert_eq!(history[0].num1, 119.0);
        for pair in history.windows(2) {
            assert!(pair[0].timestamp >= pair[1].timestamp);
            assert!(pair[0].id > pair[1].id);
        }
    }

    #[tokio::test]
    async fn test_non_finite_results_persist() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store
            .append(NewCalculation::new(Operation::Exponentiate, -8.0, Some(0.5), f64::NAN))
            .await
            .unwrap();
        store
            .append(NewCalculation::new(Operation::Factorial, 200.0, None, f64::INFINITY))
            .await
            .unwrap();

        let history = store.recent(10).await.unwrap();
        assert_eq!(history[0].result, f64::INFINITY);
        assert_eq!(history[0].num2, None);
        assert!(history[1].result.is_nan());
    }

    #[tokio::test]
    async fn test_health_status() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        let health = store.health_status().await.unwrap();
        assert!(health.connected);
        assert_eq!(health.db_name, "calculator");
        assert_eq!(health.collection_count, 1);

        store.close().await;
        let health = store.health_status().await.unwrap();
        assert!(!health.connected);
    }

    #[tokio::test]
    async fn test_reopen_keeps_records() {
        let dir = TempDir::new().unwrap();
        {
            let store = open_store(&dir).await;
            store
                .append(NewCalculation::new(Operation::Log, 8.0, Some(2.0), 3.0))
                .await
                .unwrap();
            store.close().await;
        }

        let store = open_store(&dir).await;
        let history = store.recent(100).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].operation, Operation::Log);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(open_store_with(&dir, 5).await);

        let handles: Vec<_> = (0..300_i32)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .append(NewCalculation::new(Operation::Add, f64::from(i), Some(1.0), f64::from(i + 1)))
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        let history = store.recent(1000).await.unwrap();
        assert_eq!(history.len(), 300);
        for pair in history.windows(2) {
            assert!(pair[0].timestamp >= pair[1].timestamp);
            assert!(pair[0].id > pair[1].id);
        }
    }

    #[tokio::test]
    async fn test_timestamps_never_go_backwards() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        // A row stamped an hour ahead, as left behind by a clock that was later corrected.
        let ahead = Utc::now() + chrono::Duration::hours(1);
        sqlx::query(
            "INSERT INTO calculations (operation, num1, num2, result, timestamp) VALUES ('add', 1, 1, 2, ?)",
        )
        .bind(encode_timestamp(&ahead))
        .execute(&store.pool)
        .await
        .unwrap();

        let saved = store
            .append(NewCalculation::new(Operation::Sqrt, 4.0, None, 2.0))
            .await
            .unwrap();
        assert_eq!(saved.timestamp.timestamp_micros(), ahead.timestamp_micros());

        let history = store.recent(10).await.unwrap();
        assert_eq!(history[0].id, saved.id);
        assert_eq!(history[0].operation, Operation::Sqrt);
    }
}
