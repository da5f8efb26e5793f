use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::draft::DraftError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read the {domain} document: {source}")]
    Read {
        domain: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("failed to write the {domain} document: {source}")]
    Write {
        domain: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("failed to encode the {domain} document: {source}")]
    Encode {
        domain: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history store is unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("history store authentication failed: {0}")]
    Auth(String),
    #[error("history store rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("history database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("history record is malformed: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for HistoryError {
    fn from(e: serde_json::Error) -> Self {
        HistoryError::Malformed(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidSlot,
    PhaseMismatch,
    InvalidPhase,
    Validation,
    NotFound,
    DocumentReadFailure,
    DocumentWriteFailure,
    HistoryStoreFailure,
}

/// Body of every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub success: bool,
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Draft(DraftError::InvalidSlot(_)) => ErrorCode::InvalidSlot,
            AppError::Draft(DraftError::PhaseMismatch { .. }) => ErrorCode::PhaseMismatch,
            AppError::Draft(DraftError::InvalidPhase { .. }) => ErrorCode::InvalidPhase,
            AppError::Store(StoreError::Read { .. }) => ErrorCode::DocumentReadFailure,
            AppError::Store(_) => ErrorCode::DocumentWriteFailure,
            AppError::History(_) => ErrorCode::HistoryStoreFailure,
            AppError::Validation(_) => ErrorCode::Validation,
            AppError::NotFound(_) => ErrorCode::NotFound,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.code() {
            ErrorCode::InvalidSlot | ErrorCode::InvalidPhase | ErrorCode::Validation => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::PhaseMismatch => StatusCode::CONFLICT,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::DocumentReadFailure | ErrorCode::DocumentWriteFailure => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ErrorCode::HistoryStoreFailure => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        let body = ApiError {
            success: false,
            code: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_errors_map_to_client_statuses() {
        assert_eq!(
            AppError::from(DraftError::InvalidSlot(21)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(DraftError::PhaseMismatch { slot: 3, phase: 0 }).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn history_failures_are_gateway_errors() {
        let err = AppError::from(HistoryError::Auth("no key".into()));
        assert_eq!(err.code(), ErrorCode::HistoryStoreFailure);
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
