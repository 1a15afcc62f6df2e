use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    calc::{CalcError, ValidationError},
    history::StorageError,
};

/// Everything a handler can fail with. The client only ever sees `{"error": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Calculation(#[from] CalcError),

    #[error("Failed to retrieve calculation history")]
    History(#[source] StorageError),

    #[error("Failed to check database health")]
    Health(#[source] StorageError),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Calculation(_) => StatusCode::BAD_REQUEST,
            ApiError::History(_) | ApiError::Health(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::History(source) | ApiError::Health(source) = &self {
            tracing::error!(error = %source, "{}", self);
        }

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
