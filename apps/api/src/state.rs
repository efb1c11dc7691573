use std::sync::Arc;

use crate::pipeline::{RenderLocks, RenderPipeline};
use crate::resumes::repository::ResumeRepository;
use crate::storage::ArtifactStore;

/// Shared application state injected into all route handlers via Axum extractors.
/// Built once in `main`; handlers only borrow it.
#[derive(Clone)]
pub struct AppState {
    pub resumes: Arc<dyn ResumeRepository>,
    /// Local disk or S3, chosen by `STORAGE_BACKEND`.
    pub store: Arc<dyn ArtifactStore>,
    pub pipeline: Arc<RenderPipeline>,
    /// Serializes renders of the same resume id.
    pub render_locks: RenderLocks,
}
