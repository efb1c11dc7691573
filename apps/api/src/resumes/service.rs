//! Resume orchestration: every write path of the Resume API.
//!
//! Update flow (one request, fully sequential):
//!   validate → lock(id) → load → merge → save content → render LaTeX →
//!   write → compile → rasterize → store artifacts → save artifact refs.
//!
//! Content is saved before rendering starts, so a failed render never loses
//! the user's form input. The committed artifacts change together or not at
//! all; a failed render only writes the attempt keys.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::errors::{AppError, RenderFailure, RenderStage};
use crate::latex::{render_document, TemplateKey};
use crate::models::resume::{ArtifactRefs, CreateResumeRequest, ResumeRecord, ResumeUpdate};
use crate::pipeline::{PipelineError, ProcessFailure, RenderedArtifactSet};
use crate::state::AppState;
use crate::storage::{ArtifactKey, ArtifactKind, StorageError};

/// Result of a successful update: the saved record plus where its artifacts live.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub resume: ResumeRecord,
    pub latex_file: String,
    pub pdf_file: String,
    /// `data:image/png;base64,...` of the stored preview.
    pub preview_image: String,
}

struct StoredRender {
    refs: ArtifactRefs,
    preview_png: Vec<u8>,
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Resume {id} not found"))
}

fn required(value: Option<&str>, message: &str) -> Result<String, AppError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation(message.to_string()))
}

/// Creates an empty resume. Rendering starts with the first update.
pub async fn create_resume(
    state: &AppState,
    user_id: &str,
    request: CreateResumeRequest,
) -> Result<ResumeRecord, AppError> {
    let name = required(request.name.as_deref(), "Resume name is required")?;
    let template = required(request.template.as_deref(), "Template is required")?;
    let template: TemplateKey = template
        .parse()
        .map_err(|e: crate::latex::TemplateError| AppError::Validation(e.to_string()))?;

    let record = ResumeRecord::new(user_id.to_string(), name, template.as_str().to_string());
    state.resumes.insert(&record).await?;

    info!(resume_id = %record.id, user_id = user_id, template = %template, "Created resume");
    Ok(record)
}

pub async fn get_resume(state: &AppState, id: Uuid) -> Result<ResumeRecord, AppError> {
    state.resumes.find(id).await?.ok_or_else(|| not_found(id))
}

pub async fn list_resumes(state: &AppState, user_id: &str) -> Result<Vec<ResumeRecord>, AppError> {
    let resumes = state.resumes.list_for_user(user_id).await?;
    if resumes.is_empty() {
        return Err(AppError::NotFound(
            "No resumes found for this user".to_string(),
        ));
    }
    Ok(resumes)
}

/// Merges `update` into the stored record and re-renders the whole document.
pub async fn update_resume(
    state: &AppState,
    id: Uuid,
    update: ResumeUpdate,
) -> Result<UpdateOutcome, AppError> {
    let mut update = update;
    update.validate().map_err(AppError::Validation)?;
    if let Some(raw) = update.template.take() {
        let key = TemplateKey::resolve(Some(&raw))
            .map_err(|e| AppError::Validation(e.to_string()))?;
        update.template = Some(key.as_str().to_string());
    }

    let _permit = state.render_locks.acquire(id).await;

    let mut record = state.resumes.find(id).await?.ok_or_else(|| not_found(id))?;
    record.apply(update);
    state.resumes.save_content(&record).await?;
    info!(resume_id = %id, "Resume content saved");

    let stored = render_and_store(state, &record).await?;
    state.resumes.save_artifacts(id, &stored.refs).await?;
    record.artifacts = stored.refs;
    info!(resume_id = %id, "Resume artifacts updated");

    Ok(UpdateOutcome {
        latex_file: ArtifactKey::new(id, ArtifactKind::Source).to_string(),
        pdf_file: ArtifactKey::new(id, ArtifactKind::Binary).to_string(),
        preview_image: preview_data_uri(&stored.preview_png),
        resume: record,
    })
}

async fn render_and_store(
    state: &AppState,
    record: &ResumeRecord,
) -> Result<StoredRender, AppError> {
    let id = record.id;
    let template = TemplateKey::resolve(Some(&record.template))
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let source = render_document(&record.content, template);
    debug!(resume_id = %id, template = %template, bytes = source.len(), "Rendered LaTeX");

    // Set when a failed render's files could not be uploaded; the scratch
    // copies are then the only ones left.
    let mut keep_scratch = false;
    let result = match state.pipeline.run(id, source).await {
        Ok(set) => commit_artifacts(state, id, &set).await,
        Err(PipelineError::Write(e)) => Err(AppError::Internal(
            anyhow::Error::new(e).context("Failed to write LaTeX source"),
        )),
        Err(PipelineError::Compile {
            failure,
            source_path,
        }) => {
            let files = [(ArtifactKind::Source, source_path.as_path())];
            keep_scratch = !save_attempt(state, id, &files).await;
            Err(render_failure(RenderStage::Compile, failure, id))
        }
        Err(PipelineError::Rasterize {
            failure,
            source_path,
            binary_path,
        }) => {
            keep_scratch = !save_attempt(
                state,
                id,
                &[
                    (ArtifactKind::Source, source_path.as_path()),
                    (ArtifactKind::Binary, binary_path.as_path()),
                ],
            )
            .await;
            Err(render_failure(RenderStage::Rasterize, failure, id))
        }
    };

    if keep_scratch {
        warn!(
            resume_id = %id,
            dir = %state.pipeline.writer().root().display(),
            "Keeping scratch files after failed upload"
        );
    } else {
        match state.pipeline.writer().remove_all(id).await {
            Ok(removed) => debug!(resume_id = %id, removed, "Cleared scratch files"),
            Err(e) => warn!(resume_id = %id, "Failed to clear scratch files: {e}"),
        }
    }
    result
}

fn render_failure(stage: RenderStage, failure: ProcessFailure, id: Uuid) -> AppError {
    AppError::Render(RenderFailure {
        stage,
        timed_out: failure.is_timeout(),
        details: failure.to_string(),
        latex_saved: ArtifactKey::attempt(id, ArtifactKind::Source).to_string(),
        pdf_saved: (stage == RenderStage::Rasterize)
            .then(|| ArtifactKey::attempt(id, ArtifactKind::Binary).to_string()),
    })
}

/// Uploads what a failed render produced to the attempt keys, leaving the
/// committed set untouched. Returns false if any upload failed.
async fn save_attempt(state: &AppState, id: Uuid, files: &[(ArtifactKind, &Path)]) -> bool {
    if let Err(e) = state.store.remove(&ArtifactKey::attempts(id)).await {
        warn!(resume_id = %id, "Failed to clear earlier attempt: {e}");
    }

    let mut all_saved = true;
    for (kind, path) in files {
        let key = ArtifactKey::attempt(id, *kind);
        let saved = match tokio::fs::read(path).await {
            Ok(bytes) => state.store.store(&key, bytes).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(reason) = saved {
            error!(resume_id = %id, key = %key, "Failed to save attempt artifact: {reason}");
            all_saved = false;
        }
    }
    all_saved
}

type Snapshot = Vec<(ArtifactKey, Option<Vec<u8>>)>;

/// Reads the current content of `keys`; `None` where nothing is stored.
async fn snapshot(state: &AppState, keys: &[ArtifactKey]) -> Result<Snapshot, StorageError> {
    let mut saved = Vec::with_capacity(keys.len());
    for key in keys {
        match state.store.fetch(key).await {
            Ok(bytes) => saved.push((key.clone(), Some(bytes))),
            Err(StorageError::NotFound { .. }) => saved.push((key.clone(), None)),
            Err(e) => return Err(e),
        }
    }
    Ok(saved)
}

/// Puts every key back to its snapshotted state. Best-effort.
async fn restore(state: &AppState, id: Uuid, saved: &[(ArtifactKey, Option<Vec<u8>>)]) {
    for (key, previous) in saved {
        let result = match previous {
            Some(bytes) => state.store.store(key, bytes.clone()).await,
            None => state.store.remove(std::slice::from_ref(key)).await,
        };
        if let Err(e) = result {
            error!(resume_id = %id, key = %key, "Failed to restore artifact: {e}");
        }
    }
}

/// Stores source, PDF and preview as one unit. If an upload fails, the keys
/// already written are put back to what they held before.
async fn commit_artifacts(
    state: &AppState,
    id: Uuid,
    set: &RenderedArtifactSet,
) -> Result<StoredRender, AppError> {
    let pdf = tokio::fs::read(&set.binary_path).await.map_err(|e| {
        AppError::Internal(anyhow::Error::new(e).context("Failed to read compiled PDF"))
    })?;
    let png = tokio::fs::read(&set.preview_path).await.map_err(|e| {
        AppError::Internal(anyhow::Error::new(e).context("Failed to read preview image"))
    })?;
    debug!(resume_id = %id, source = %set.source_path.display(), "Committing artifacts");

    let keys = ArtifactKey::committed(id);
    let previous = snapshot(state, &keys).await?;
    let contents = [set.source_text.clone().into_bytes(), pdf, png.clone()];

    for (written, (key, bytes)) in keys.iter().zip(contents).enumerate() {
        if let Err(e) = state.store.store(key, bytes).await {
            error!(resume_id = %id, key = %key, "Artifact upload failed, rolling back: {e}");
            restore(state, id, &previous[..written]).await;
            return Err(e.into());
        }
    }
    info!(resume_id = %id, backend = state.store.backend(), "Stored artifacts");

    if let Err(e) = state.store.remove(&ArtifactKey::attempts(id)).await {
        warn!(resume_id = %id, "Failed to clear earlier attempt: {e}");
    }

    Ok(StoredRender {
        refs: ArtifactRefs {
            latex_path: Some(ArtifactKey::new(id, ArtifactKind::Source).to_string()),
            pdf_path: Some(ArtifactKey::new(id, ArtifactKind::Binary).to_string()),
            preview_image: Some(ArtifactKey::new(id, ArtifactKind::Preview).to_string()),
        },
        preview_png: png,
    })
}

pub fn preview_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

/// Deletes a resume and all of its artifacts.
///
/// Artifacts go first. If the store cannot delete them, or the record delete
/// fails afterwards, the artifacts are written back, so a failed delete
/// leaves nothing half-removed.
pub async fn delete_resume(state: &AppState, id: Uuid) -> Result<(), AppError> {
    let _permit = state.render_locks.acquire(id).await;

    if state.resumes.find(id).await?.is_none() {
        return Err(not_found(id));
    }

    let keys = ArtifactKey::all_for(id);
    let saved = snapshot(state, &keys).await?;

    if let Err(e) = state.store.remove(&keys).await {
        error!(resume_id = %id, "Artifact deletion failed, restoring: {e}");
        restore(state, id, &saved).await;
        return Err(e.into());
    }

    let deleted = match state.resumes.delete(id).await {
        Ok(deleted) => deleted,
        Err(e) => {
            error!(resume_id = %id, "Record deletion failed, restoring artifacts: {e}");
            restore(state, id, &saved).await;
            return Err(e.into());
        }
    };
    if !deleted {
        return Err(not_found(id));
    }

    if let Err(e) = state.pipeline.writer().remove_all(id).await {
        warn!(resume_id = %id, "Failed to clear scratch files: {e}");
    }
    info!(resume_id = %id, "Deleted resume and artifacts");
    Ok(())
}

/// Returns the stored PDF's file name and bytes.
pub async fn download_pdf(state: &AppState, id: Uuid) -> Result<(String, Vec<u8>), AppError> {
    if state.resumes.find(id).await?.is_none() {
        return Err(not_found(id));
    }
    let key = ArtifactKey::new(id, ArtifactKind::Binary);
    match state.store.fetch(&key).await {
        Ok(bytes) => Ok((key.file_name().to_string(), bytes)),
        Err(StorageError::NotFound { .. }) => Err(AppError::NotFound(format!(
            "No PDF has been generated for resume {id}"
        ))),
        Err(e) => Err(e.into()),
    }
}
