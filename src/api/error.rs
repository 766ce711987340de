use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::api::handlers::images::FailureResponse;
use crate::error::JobError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("No variant could be produced")]
    VariantsFailed(Vec<FailureResponse>),
}

impl From<JobError> for AppError {
    fn from(e: JobError) -> Self {
        match e {
            JobError::Planning(e) => AppError::Unprocessable(e.to_string()),
            JobError::AllVariantsFailed { failures } => {
                AppError::VariantsFailed(failures.iter().map(FailureResponse::from).collect())
            }
            JobError::RemoteDisabled => {
                AppError::ServiceUnavailable("Object storage is not configured".to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::VariantsFailed(failures) => {
                tracing::error!("All {} variants failed", failures.len());
                let body = Json(json!({
                    "error": "No variant could be produced",
                    "failures": failures,
                }));
                return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
