use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

/// Compiler byproducts removed after every compile attempt.
const AUX_EXTENSIONS: &[&str] = &["aux", "log", "out", "toc", "fls", "fdb_latexmk", "synctex.gz"];

/// File stem shared by every scratch file of one resume.
pub fn file_stem(resume_id: &str) -> String {
    format!("resume_{resume_id}")
}

/// Returns what follows `resume_{id}` in `file_name` when the file belongs to
/// that resume. The id must be followed by the end of the name, `.` or `_`,
/// so id `12` never claims the files of id `123`.
pub fn owned_suffix<'a>(file_name: &'a str, resume_id: &str) -> Option<&'a str> {
    let rest = file_name
        .strip_prefix("resume_")?
        .strip_prefix(resume_id)?;
    match rest.chars().next() {
        None | Some('.') | Some('_') => Some(rest),
        Some(_) => None,
    }
}

/// Writes rendered LaTeX into the shared scratch directory under a stable,
/// resume-scoped name, and cleans up after the files it owns.
#[derive(Debug, Clone)]
pub struct DocumentWriter {
    root: PathBuf,
}

impl DocumentWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source_path(&self, resume_id: Uuid) -> PathBuf {
        self.root
            .join(format!("{}.tex", file_stem(&resume_id.to_string())))
    }

    /// Persists `source` as `resume_{id}.tex`, replacing any earlier version.
    ///
    /// The content goes to a sibling `.partial` file first and is renamed into
    /// place, so readers never see a half-written source.
    pub async fn write(&self, resume_id: Uuid, source: &str) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await?;
        let removed = self.remove_stale(resume_id).await?;
        if removed > 0 {
            info!(resume_id = %resume_id, removed, "Removed stale scratch files");
        }

        let path = self.source_path(resume_id);
        let partial = path.with_extension("tex.partial");
        tokio::fs::write(&partial, source.as_bytes()).await?;
        tokio::fs::rename(&partial, &path).await?;
        debug!(resume_id = %resume_id, path = %path.display(), bytes = source.len(), "Wrote LaTeX source");
        Ok(path)
    }

    /// Deletes timestamped or variant files (`resume_{id}_*`) left by older
    /// naming schemes.
    pub async fn remove_stale(&self, resume_id: Uuid) -> io::Result<usize> {
        self.remove_where(resume_id, |suffix| suffix.starts_with('_'))
            .await
    }

    /// Best-effort removal of compiler byproducts for this resume.
    pub async fn remove_aux(&self, resume_id: Uuid) {
        let result = self
            .remove_where(resume_id, |suffix| {
                suffix
                    .strip_prefix('.')
                    .is_some_and(|ext| AUX_EXTENSIONS.contains(&ext))
            })
            .await;
        if let Err(e) = result {
            debug!(resume_id = %resume_id, "Ignoring aux cleanup failure: {e}");
        }
    }

    /// Removes every scratch file this resume owns.
    pub async fn remove_all(&self, resume_id: Uuid) -> io::Result<usize> {
        self.remove_where(resume_id, |_| true).await
    }

    async fn remove_where<F>(&self, resume_id: Uuid, matches: F) -> io::Result<usize>
    where
        F: Fn(&str) -> bool,
    {
        let id = resume_id.to_string();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if owned_suffix(name, &id).is_some_and(&matches) {
                match tokio::fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(removed)
    }
}
