//! In-memory stand-ins for the database and the external tools, so the whole
//! update flow runs in unit tests without Postgres, pdflatex or Ghostscript.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::resume::{ArtifactRefs, ResumeRecord};
use crate::pipeline::{
    DocumentCompiler, DocumentWriter, ProcessFailure, Rasterizer, RenderLocks, RenderPipeline,
};
use crate::resumes::repository::ResumeRepository;
use crate::state::AppState;
use crate::storage::local::LocalArtifactStore;
use crate::storage::{ArtifactKey, ArtifactKind, ArtifactStore, StorageError};

#[derive(Default)]
pub struct InMemoryResumes {
    records: Mutex<HashMap<Uuid, ResumeRecord>>,
    /// Makes `delete` fail as if the database went away.
    pub fail_deletes: AtomicBool,
}

#[async_trait]
impl ResumeRepository for InMemoryResumes {
    async fn insert(&self, record: &ResumeRecord) -> Result<(), sqlx::Error> {
        self.records.lock().unwrap().insert(record.id, record.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<ResumeRecord>, sqlx::Error> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ResumeRecord>, sqlx::Error> {
        let mut records: Vec<_> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(records)
    }

    async fn save_content(&self, record: &ResumeRecord) -> Result<(), sqlx::Error> {
        if let Some(stored) = self.records.lock().unwrap().get_mut(&record.id) {
            stored.name = record.name.clone();
            stored.template = record.template.clone();
            stored.content = record.content.clone();
            stored.last_updated = record.last_updated;
        }
        Ok(())
    }

    async fn save_artifacts(&self, id: Uuid, artifacts: &ArtifactRefs) -> Result<(), sqlx::Error> {
        if let Some(stored) = self.records.lock().unwrap().get_mut(&id) {
            stored.artifacts = artifacts.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(self.records.lock().unwrap().remove(&id).is_some())
    }
}

/// Copies the source to `.pdf` and leaves `.log`/`.aux` byproducts behind,
/// like a real LaTeX run. Fails when the source contains `fail_marker`.
#[derive(Clone, Default)]
pub struct FakeCompiler {
    fail_marker: Option<String>,
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl FakeCompiler {
    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Highest number of compiles observed running at once.
    pub fn peak(&self) -> Arc<AtomicUsize> {
        self.peak.clone()
    }
}

#[async_trait]
impl DocumentCompiler for FakeCompiler {
    async fn compile(&self, source: &Path) -> Result<PathBuf, ProcessFailure> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        let result = self.run(source).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl FakeCompiler {
    async fn run(&self, source: &Path) -> Result<PathBuf, ProcessFailure> {
        let spawn_err = |e: std::io::Error| ProcessFailure::Spawn {
            program: "fake-latex".to_string(),
            source: e,
        };
        let text = tokio::fs::read_to_string(source).await.map_err(spawn_err)?;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        tokio::fs::write(source.with_extension("log"), "log").await.map_err(spawn_err)?;
        tokio::fs::write(source.with_extension("aux"), "aux").await.map_err(spawn_err)?;

        if let Some(marker) = &self.fail_marker {
            if text.contains(marker.as_str()) {
                return Err(ProcessFailure::Exited {
                    program: "fake-latex".to_string(),
                    status: "exit status: 1".to_string(),
                    output: "! Undefined control sequence.".to_string(),
                });
            }
        }
        let pdf = source.with_extension("pdf");
        tokio::fs::write(&pdf, text).await.map_err(spawn_err)?;
        Ok(pdf)
    }
}

/// Copies the PDF to `.png`, or fails every call.
#[derive(Clone, Default)]
pub struct FakeRasterizer {
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl FakeRasterizer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl Rasterizer for FakeRasterizer {
    async fn rasterize(&self, pdf: &Path) -> Result<PathBuf, ProcessFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProcessFailure::TimedOut {
                program: "fake-gs".to_string(),
                limit: Duration::from_secs(30),
            });
        }
        let png = pdf.with_extension("png");
        tokio::fs::copy(pdf, &png)
            .await
            .map_err(|e| ProcessFailure::Spawn {
                program: "fake-gs".to_string(),
                source: e,
            })?;
        Ok(png)
    }
}

/// Local store that can be told to fail: uploads of one artifact kind, or
/// a remove that deletes the first key and then gives up.
pub struct FlakyStore {
    inner: LocalArtifactStore,
    fail_store_kind: Mutex<Option<ArtifactKind>>,
    partial_remove: AtomicBool,
}

impl FlakyStore {
    pub fn new(root: &Path) -> Self {
        Self {
            inner: LocalArtifactStore::new(root),
            fail_store_kind: Mutex::new(None),
            partial_remove: AtomicBool::new(false),
        }
    }

    pub fn fail_stores_of(&self, kind: Option<ArtifactKind>) {
        *self.fail_store_kind.lock().unwrap() = kind;
    }

    pub fn fail_removes_after_first(&self) {
        self.partial_remove.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ArtifactStore for FlakyStore {
    async fn store(&self, key: &ArtifactKey, bytes: Vec<u8>) -> Result<(), StorageError> {
        if *self.fail_store_kind.lock().unwrap() == Some(key.kind()) {
            return Err(StorageError::Write {
                key: key.to_string(),
                reason: "quota exceeded".to_string(),
            });
        }
        self.inner.store(key, bytes).await
    }

    async fn fetch(&self, key: &ArtifactKey) -> Result<Vec<u8>, StorageError> {
        self.inner.fetch(key).await
    }

    async fn remove(&self, keys: &[ArtifactKey]) -> Result<(), StorageError> {
        if !self.partial_remove.load(Ordering::SeqCst) {
            return self.inner.remove(keys).await;
        }
        let Some((first, rest)) = keys.split_first() else {
            return Ok(());
        };
        self.inner.remove(std::slice::from_ref(first)).await?;
        match rest.first() {
            Some(key) => Err(StorageError::Delete {
                key: key.to_string(),
                reason: "access denied".to_string(),
            }),
            None => Ok(()),
        }
    }

    fn backend(&self) -> &'static str {
        "flaky"
    }
}

/// Test wiring: in-memory records, artifacts and scratch files under `dir`.
pub struct TestApp {
    pub state: AppState,
    /// The repository behind `state.resumes`.
    pub resumes: Arc<InMemoryResumes>,
    pub artifacts_dir: PathBuf,
    pub scratch_dir: PathBuf,
}

pub fn test_app(dir: &Path, compiler: FakeCompiler, rasterizer: FakeRasterizer) -> TestApp {
    let artifacts_dir = dir.join("artifacts");
    let store = Arc::new(LocalArtifactStore::new(&artifacts_dir));
    test_app_with_store(dir, store, compiler, rasterizer)
}

pub fn test_app_with_store(
    dir: &Path,
    store: Arc<dyn ArtifactStore>,
    compiler: FakeCompiler,
    rasterizer: FakeRasterizer,
) -> TestApp {
    let scratch_dir = dir.join("scratch");
    let pipeline = RenderPipeline::new(
        DocumentWriter::new(&scratch_dir),
        Arc::new(compiler),
        Arc::new(rasterizer),
    );
    let resumes = Arc::new(InMemoryResumes::default());
    TestApp {
        state: AppState {
            resumes: resumes.clone(),
            store,
            pipeline: Arc::new(pipeline),
            render_locks: RenderLocks::new(),
        },
        resumes,
        artifacts_dir: dir.join("artifacts"),
        scratch_dir,
    }
}
