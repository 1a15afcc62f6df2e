pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calc::Operation;

pub use memory::InMemoryHistoryStore;
pub use sqlite::SqliteHistoryStore;

/// Number of records served by the history endpoint.
pub const DEFAULT_HISTORY_LIMIT: u32 = 100;

/// A computation waiting to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCalculation {
    pub operation: Operation,
    pub num1: f64,
    pub num2: Option<f64>,
    pub result: f64,
}

impl NewCalculation {
    pub fn new(operation: Operation, num1: f64, num2: Option<f64>, result: f64) -> Self {
        // Unary operations never carry a second operand.
        let num2 = if operation.is_unary() { None } else { num2 };
        Self {
            operation,
            num1,
            num2,
            result,
        }
    }
}

/// A persisted computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRecord {
    pub id: i64,
    pub operation: Operation,
    pub num1: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num2: Option<f64>,
    pub result: f64,
    pub timestamp: DateTime<Utc>,
}

/// Connectivity snapshot of the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub connected: bool,
    pub db_name: String,
    pub collection_count: usize,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: i64, reason: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Durable append-only log of computations.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist a computation, stamping it with the current time.
    async fn append(&self, calc: NewCalculation) -> Result<CalculationRecord, StorageError>;

    /// Up to `limit` newest records, newest first.
    async fn recent(&self, limit: u32) -> Result<Vec<CalculationRecord>, StorageError>;

    async fn health_status(&self) -> Result<HealthStatus, StorageError>;
}
