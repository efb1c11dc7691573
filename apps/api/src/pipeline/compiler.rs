use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::pipeline::process::{run_bounded, ProcessFailure};

/// Turns a LaTeX source file into a PDF next to it.
///
/// Kept as a capability so an in-process engine can replace the external
/// binary without touching the pipeline.
#[async_trait]
pub trait DocumentCompiler: Send + Sync {
    async fn compile(&self, source: &Path) -> Result<PathBuf, ProcessFailure>;
}

/// `pdflatex` in non-interactive mode, halting on the first error.
#[derive(Debug, Clone)]
pub struct PdfLatex {
    program: String,
    timeout: Duration,
}

impl PdfLatex {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn command(&self, source: &Path) -> Command {
        let dir = working_dir(source);
        let mut cmd = Command::new(&self.program);
        cmd.arg("-interaction=nonstopmode")
            .arg("-halt-on-error")
            .arg("-no-shell-escape")
            .arg(format!("-output-directory={}", dir.display()))
            .arg(source);
        cmd
    }
}

/// Directory the source lives in; compiler output lands beside it.
fn working_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[async_trait]
impl DocumentCompiler for PdfLatex {
    async fn compile(&self, source: &Path) -> Result<PathBuf, ProcessFailure> {
        run_bounded(self.command(source), self.timeout).await?;

        let pdf = source.with_extension("pdf");
        if !tokio::fs::try_exists(&pdf).await.unwrap_or(false) {
            return Err(ProcessFailure::MissingOutput {
                program: self.program.clone(),
                path: pdf,
            });
        }
        info!(pdf = %pdf.display(), "Compiled LaTeX source");
        Ok(pdf)
    }
}
