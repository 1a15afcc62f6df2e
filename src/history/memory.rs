//! Process-local history, used by tests and `--in-memory` runs.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{CalculationRecord, HealthStatus, HistoryStore, NewCalculation, StorageError};

#[derive(Debug, Clone)]
pub struct InMemoryHistoryStore {
    inner: Arc<Mutex<Vec<CalculationRecord>>>,
    db_name: String,
}

impl InMemoryHistoryStore {
    pub fn new(db_name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
            db_name: db_name.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.records().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn records(&self) -> Result<MutexGuard<'_, Vec<CalculationRecord>>, StorageError> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Unavailable("history lock poisoned".to_string()))
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, calc: NewCalculation) -> Result<CalculationRecord, StorageError> {
        let mut records = self.records()?;

        // Keep timestamps non-decreasing even if the wall clock steps back.
        let now = Utc::now();
        let timestamp = records
            .last()
            .map_or(now, |last| last.timestamp.max(now));

        let record = CalculationRecord {
            id: records.len() as i64 + 1,
            operation: calc.operation,
            num1: calc.num1,
            num2: calc.num2,
            result: calc.result,
            timestamp,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<CalculationRecord>, StorageError> {
        let records = self.records()?;
        Ok(records
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn health_status(&self) -> Result<HealthStatus, StorageError> {
        Ok(HealthStatus {
            connected: true,
            db_name: self.db_name.clone(),
            collection_count: 1,
        })
    }
}
