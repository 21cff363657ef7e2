use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::export::ExportError;
use crate::layout::MeasureError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Export(ExportError::NothingToExport) => (
                StatusCode::CONFLICT,
                "NOTHING_TO_EXPORT",
                "Submit resume content before exporting".to_string(),
            ),
            AppError::Export(ExportError::Measurement(e)) => {
                tracing::warn!("Export measurement failed: {e}");
                let message = match e {
                    MeasureError::NotMounted => "The layout surface is not ready, try again shortly",
                    MeasureError::BoxCountMismatch { .. } => "The document could not be laid out",
                };
                (StatusCode::SERVICE_UNAVAILABLE, "LAYOUT_NOT_READY", message.to_string())
            }
            AppError::Export(ExportError::Render(msg)) => {
                tracing::error!("PDF render error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EXPORT_FAILED",
                    "The PDF could not be generated".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
