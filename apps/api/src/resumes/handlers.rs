use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{CreateResumeRequest, ResumeRecord, ResumeUpdate};
use crate::resumes::service::{self, UpdateOutcome};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    pub resume: ResumeRecord,
    pub latex_file: String,
    pub pdf_file: String,
    pub preview_image: String,
}

impl From<UpdateOutcome> for UpdateResponse {
    fn from(outcome: UpdateOutcome) -> Self {
        Self {
            resume: outcome.resume,
            latex_file: outcome.latex_file,
            pdf_file: outcome.pdf_file,
            preview_image: outcome.preview_image,
        }
    }
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub id: Uuid,
}

/// POST /create/:userId
pub async fn handle_create(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<CreateResumeRequest>,
) -> Result<(StatusCode, Json<ResumeRecord>), AppError> {
    let record = service::create_resume(&state, &user_id, req).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// POST /update/:id
pub async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<ResumeUpdate>,
) -> Result<Json<UpdateResponse>, AppError> {
    let outcome = service::update_resume(&state, id, update).await?;
    Ok(Json(outcome.into()))
}

/// DELETE /delete/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, AppError> {
    service::delete_resume(&state, id).await?;
    Ok(Json(DeleteResponse {
        message: "Resume deleted".to_string(),
        id,
    }))
}

/// GET /get/:userId
pub async fn handle_list(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ResumeRecord>>, AppError> {
    Ok(Json(service::list_resumes(&state, &user_id).await?))
}

/// GET /resume/:id and GET /get-by-id/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeRecord>, AppError> {
    Ok(Json(service::get_resume(&state, id).await?))
}

/// GET /download/:id
pub async fn handle_download(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let (file_name, bytes) = service::download_pdf(&state, id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}
