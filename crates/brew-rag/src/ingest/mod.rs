//! Offline ingestion: manifest → loaders → splitter → index
//!
//! A row that fails to load is logged and skipped; only a missing manifest
//! or an index write failure aborts the run.

pub mod loaders;
pub mod manifest;
pub mod splitter;
pub mod transcript;
pub mod validate;

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use brew_core::{Result, VectorStore};

pub use loaders::SourceLoader;
pub use manifest::{read_manifest, ManifestRow};
pub use splitter::TextSplitter;
pub use transcript::{TimedTextTranscripts, TranscriptSource};
pub use validate::{SourceValidator, ValidationReport};

/// A row that produced no documents because loading failed
#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    pub kind: String,
    pub location: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub rows: usize,
    pub documents: usize,
    pub chunks: usize,
    pub failures: Vec<RowFailure>,
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows, {} documents, {} chunks indexed",
            self.rows, self.documents, self.chunks
        )?;
        if !self.failures.is_empty() {
            write!(f, ", {} rows skipped", self.failures.len())?;
        }
        Ok(())
    }
}

pub struct Ingestor {
    loader: SourceLoader,
    splitter: TextSplitter,
    store: Arc<dyn VectorStore>,
}

impl Ingestor {
    pub fn new(loader: SourceLoader, splitter: TextSplitter, store: Arc<dyn VectorStore>) -> Self {
        Self {
            loader,
            splitter,
            store,
        }
    }

    /// Ingest every row of `manifest`. With `rebuild` the index is emptied
    /// first; otherwise chunks are upserted into what is already there.
    pub async fn run(&self, manifest: &Path, rebuild: bool) -> Result<IngestReport> {
        let rows = read_manifest(manifest)?;
        info!(rows = rows.len(), manifest = %manifest.display(), "Loading sources");

        let mut report = IngestReport {
            rows: rows.len(),
            ..Default::default()
        };
        let mut documents = Vec::new();

        for row in &rows {
            match self.loader.load(row).await {
                Ok(loaded) => {
                    info!(kind = %row.kind, source = %row.location, documents = loaded.len(), "Loaded source");
                    documents.extend(loaded);
                }
                Err(e) => {
                    warn!(kind = %row.kind, source = %row.location, error = %e, "Skipping source");
                    report.failures.push(RowFailure {
                        kind: row.kind.clone(),
                        location: row.location.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        report.documents = documents.len();

        let chunks = self.splitter.split_documents(&documents);
        info!(chunks = chunks.len(), "Split documents");

        if rebuild {
            self.store.clear().await?;
        }
        report.chunks = self.store.add_documents(chunks).await?;
        self.store.persist().await?;

        info!(%report, "Ingestion finished");
        Ok(report)
    }
}
