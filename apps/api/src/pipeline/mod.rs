// Render pipeline: write LaTeX → compile to PDF → rasterize a PNG preview.
// Each stage runs to completion before the next; external tools are bounded
// by timeouts. Storage of the results is the caller's job.

pub mod compiler;
pub mod locks;
pub mod process;
pub mod rasterizer;
pub mod writer;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

pub use compiler::{DocumentCompiler, PdfLatex};
pub use locks::{RenderLocks, RenderPermit};
pub use process::ProcessFailure;
pub use rasterizer::{Ghostscript, Rasterizer};
pub use writer::DocumentWriter;

/// Outputs of one successful run. Owned by a single render; never shared.
#[derive(Debug, Clone)]
pub struct RenderedArtifactSet {
    pub source_text: String,
    pub source_path: PathBuf,
    pub binary_path: PathBuf,
    pub preview_path: PathBuf,
}

/// Which stage failed, plus whatever files survived it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to write LaTeX source: {0}")]
    Write(#[from] io::Error),

    #[error("PDF compilation failed: {failure}")]
    Compile {
        failure: ProcessFailure,
        source_path: PathBuf,
    },

    #[error("preview rasterization failed: {failure}")]
    Rasterize {
        failure: ProcessFailure,
        source_path: PathBuf,
        binary_path: PathBuf,
    },
}

pub struct RenderPipeline {
    writer: DocumentWriter,
    compiler: Arc<dyn DocumentCompiler>,
    rasterizer: Arc<dyn Rasterizer>,
}

impl RenderPipeline {
    pub fn new(
        writer: DocumentWriter,
        compiler: Arc<dyn DocumentCompiler>,
        rasterizer: Arc<dyn Rasterizer>,
    ) -> Self {
        Self {
            writer,
            compiler,
            rasterizer,
        }
    }

    pub fn writer(&self) -> &DocumentWriter {
        &self.writer
    }

    /// Runs write → compile → rasterize for one resume. Compiler byproducts
    /// are removed whether or not compilation succeeded.
    ///
    /// Callers must hold the resume's [`RenderPermit`]; the scratch file names
    /// are shared by every render of the same resume.
    pub async fn run(
        &self,
        resume_id: Uuid,
        source_text: String,
    ) -> Result<RenderedArtifactSet, PipelineError> {
        let source_path = self.writer.write(resume_id, &source_text).await?;
        info!(resume_id = %resume_id, "LaTeX source written");

        let compiled = self.compiler.compile(&source_path).await;
        self.writer.remove_aux(resume_id).await;
        let binary_path = match compiled {
            Ok(path) => path,
            Err(failure) => {
                warn!(resume_id = %resume_id, timed_out = failure.is_timeout(), "Compilation failed: {failure}");
                return Err(PipelineError::Compile {
                    failure,
                    source_path,
                });
            }
        };
        info!(resume_id = %resume_id, "PDF compiled");

        let preview_path = match self.rasterizer.rasterize(&binary_path).await {
            Ok(path) => path,
            Err(failure) => {
                warn!(resume_id = %resume_id, timed_out = failure.is_timeout(), "Rasterization failed: {failure}");
                return Err(PipelineError::Rasterize {
                    failure,
                    source_path,
                    binary_path,
                });
            }
        };
        info!(resume_id = %resume_id, "Preview rasterized");

        Ok(RenderedArtifactSet {
            source_text,
            source_path,
            binary_path,
            preview_path,
        })
    }
}
