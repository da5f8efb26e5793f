pub mod documents;
pub mod draft;
pub mod history;

use axum::{Json, extract::rejection::JsonRejection};
use serde::Serialize;

use crate::error::AppError;

/// Plain acknowledgement for writes that return nothing else.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

/// Unwraps a JSON body, turning axum's rejection into a validation error.
pub fn payload<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}
