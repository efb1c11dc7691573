use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::storage::StorageError;

/// Pipeline stage a render failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Compile,
    Rasterize,
}

/// A render that failed after the user's content was saved. Carries the
/// artifact references that survived so the client need not resubmit.
#[derive(Debug, Error)]
#[error("{stage:?} failed: {details}")]
pub struct RenderFailure {
    pub stage: RenderStage,
    pub details: String,
    pub timed_out: bool,
    /// Storage key of the preserved LaTeX source.
    pub latex_saved: String,
    /// Storage key of the compiled PDF when only rasterization failed.
    pub pdf_saved: Option<String>,
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Render error: {0}")]
    Render(RenderFailure),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Render(failure) => return render_failure_response(failure),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Storage(StorageError::NotFound { key }) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", format!("{key} not found"))
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
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

fn render_failure_response(failure: RenderFailure) -> Response {
    if failure.timed_out {
        tracing::warn!(stage = ?failure.stage, "Render timed out: {}", failure.details);
    }
    let mut body = match failure.stage {
        RenderStage::Compile => json!({
            "error": "PDF generation failed",
            "details": failure.details,
            "latexSaved": failure.latex_saved,
        }),
        RenderStage::Rasterize => json!({
            "error": "Preview generation failed",
            "details": failure.details,
            "latexSaved": failure.latex_saved,
            "pdfSaved": failure.pdf_saved,
        }),
    };
    if failure.timed_out {
        body["timedOut"] = json!(true);
    }
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
