use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::pipeline::process::{run_bounded, ProcessFailure};

pub const DEFAULT_PREVIEW_DPI: u32 = 150;

/// Renders the first page of a PDF to a PNG preview next to it.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, pdf: &Path) -> Result<PathBuf, ProcessFailure>;
}

#[derive(Debug, Clone)]
pub struct Ghostscript {
    program: String,
    dpi: u32,
    timeout: Duration,
}

impl Ghostscript {
    pub fn new(program: impl Into<String>, dpi: u32, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            dpi,
            timeout,
        }
    }

    fn command(&self, pdf: &Path, png: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-dSAFER")
            .arg("-dBATCH")
            .arg("-dNOPAUSE")
            .arg("-dQUIET")
            .arg("-sDEVICE=png16m")
            .arg(format!("-r{}", self.dpi))
            .arg("-dFirstPage=1")
            .arg("-dLastPage=1")
            .arg(format!("-sOutputFile={}", png.display()))
            .arg(pdf);
        cmd
    }
}

#[async_trait]
impl Rasterizer for Ghostscript {
    async fn rasterize(&self, pdf: &Path) -> Result<PathBuf, ProcessFailure> {
        let png = pdf.with_extension("png");
        run_bounded(self.command(pdf, &png), self.timeout).await?;

        if !tokio::fs::try_exists(&png).await.unwrap_or(false) {
            return Err(ProcessFailure::MissingOutput {
                program: self.program.clone(),
                path: png,
            });
        }
        info!(png = %png.display(), dpi = self.dpi, "Rasterized preview");
        Ok(png)
    }
}
