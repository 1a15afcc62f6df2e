//! Route handlers. Each computation runs validate, evaluate, then record.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{AppState, error::ApiError};
use crate::{
    calc::{Operation, ValidationError, evaluate, validate},
    history::{CalculationRecord, DEFAULT_HISTORY_LIMIT, NewCalculation},
};

/// Raw query parameters, still untyped.
#[derive(Debug, Default, Deserialize)]
pub struct CalcQuery {
    pub num1: Option<String>,
    pub num2: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CalcResponse {
    pub result: f64,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<CalculationRecord>,
}

#[derive(Debug, Serialize)]
pub struct DbHealthResponse {
    pub status: &'static str,
    #[serde(rename = "dbName")]
    pub db_name: String,
    pub collections: usize,
}

pub async fn calculate(
    State(state): State<AppState>,
    op: Operation,
    query: Result<Query<CalcQuery>, QueryRejection>,
) -> Result<Json<CalcResponse>, ApiError> {
    let Query(query) = query.map_err(|rejection| {
        error!(operation = %op, error = %rejection, "Malformed query string");
        ValidationError::MissingOrInvalid
    })?;

    // num2 is checked on every route; unary operations just never use it.
    let operands = validate(query.num1.as_deref(), query.num2.as_deref()).inspect_err(|e| {
        error!(operation = %op, error = %e, "Invalid input");
    })?;

    let result = evaluate(op, operands.num1, operands.num2).inspect_err(|e| {
        error!(operation = %op, num1 = operands.num1, num2 = ?operands.num2, error = %e, "Calculation rejected");
    })?;

    info!(operation = %op, num1 = operands.num1, num2 = ?operands.num2, result, "Calculation performed");

    record(&state, NewCalculation::new(op, operands.num1, operands.num2, result)).await;

    Ok(Json(CalcResponse { result }))
}

/// Persist a computation. Failures are logged and never reach the client.
async fn record(state: &AppState, calc: NewCalculation) {
    let operation = calc.operation;
    match state.store.append(calc).await {
        Ok(saved) => info!(operation = %operation, id = saved.id, "Saved calculation to database"),
        Err(e) => error!(operation = %operation, error = %e, "Error saving calculation"),
    }
}

pub async fn history(State(state): State<AppState>) -> Result<Json<HistoryResponse>, ApiError> {
    let history = state
        .store
        .recent(DEFAULT_HISTORY_LIMIT)
        .await
        .map_err(ApiError::History)?;

    Ok(Json(HistoryResponse { history }))
}

pub async fn db_health(State(state): State<AppState>) -> Result<Json<DbHealthResponse>, ApiError> {
    let health = state.store.health_status().await.map_err(ApiError::Health)?;

    Ok(Json(DbHealthResponse {
        status: if health.connected {
            "Connected"
        } else {
            "Disconnected"
        },
        db_name: health.db_name,
        collections: health.collection_count,
    }))
}

pub async fn health() -> &'static str {
    "OK"
}
