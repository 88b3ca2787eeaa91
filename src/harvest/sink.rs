//! Filesystem sink and the naming rule shared with the completion filter.
//!
//! DOIs contain `/`, so the naming rule flattens them before they become
//! file names. The same rule feeds the completion filter, which is what
//! makes reruns skip work already on disk.

use std::path::PathBuf;

use crate::error::StorageError;
use crate::pipeline::{Artifact, CompletionFilter, ResultSink, WorkItem};

/// Deterministic mapping from a DOI to a safe file stem.
pub fn doi_to_filename(doi: &str) -> String {
    doi.replace('/', "_")
}

/// Writes one `<doi>.pdf` per item into a flat output directory. Append-only
/// per item id: distinct items never write to the same path.
pub struct PdfDirSink {
    out_dir: PathBuf,
}

impl PdfDirSink {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    pub fn expected_path(&self, item: &WorkItem) -> PathBuf {
        self.out_dir
            .join(format!("{}.pdf", doi_to_filename(&item.id)))
    }

    /// Completion filter over this sink's naming rule.
    pub fn completion_filter(&self) -> CompletionFilter {
        let out_dir = self.out_dir.clone();
        CompletionFilter::new(move |item| {
            out_dir.join(format!("{}.pdf", doi_to_filename(&item.id)))
        })
    }
}

impl ResultSink for PdfDirSink {
    async fn store(&self, item: &WorkItem, artifact: Artifact) -> Result<String, StorageError> {
        let path = self.expected_path(item);
        tokio::fs::write(&path, artifact.into_bytes()).await?;
        Ok(path.display().to_string())
    }
}
