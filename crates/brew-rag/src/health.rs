//! Diagnostics snapshot of the configured stack

use serde::Serialize;
use std::fmt;
use tracing::warn;

use brew_core::{Settings, VectorStore};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub persist_directory: String,
    pub embedding_model: String,
    pub llm_model: String,
    pub retrieval_k: usize,
    /// `None` when the index could not be read
    pub indexed_chunks: Option<usize>,
    pub api_key_set: bool,
}

impl HealthReport {
    /// Snapshot the settings and, when an index could be opened, its size
    pub async fn collect(
        settings: &Settings,
        store: Option<&dyn VectorStore>,
        api_key_set: bool,
    ) -> Self {
        let indexed_chunks = match store {
            Some(store) => match store.count().await {
                Ok(n) => Some(n),
                Err(e) => {
                    warn!(error = %e, "Could not count indexed chunks");
                    None
                }
            },
            None => None,
        };

        Self {
            persist_directory: settings.persist_directory.display().to_string(),
            embedding_model: settings.embedding_model.clone(),
            llm_model: settings.llm_model.clone(),
            retrieval_k: settings.retrieval_k,
            indexed_chunks,
            api_key_set,
        }
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chunks = self
            .indexed_chunks
            .map_or_else(|| "unknown".to_string(), |n| n.to_string());
        writeln!(f, "Persist directory: {}", self.persist_directory)?;
        writeln!(f, "Embedding model:   {}", self.embedding_model)?;
        writeln!(f, "LLM model:         {}", self.llm_model)?;
        writeln!(f, "Retrieval k:       {}", self.retrieval_k)?;
        writeln!(f, "Indexed chunks:    {}", chunks)?;
        write!(
            f,
            "API key:           {}",
            if self.api_key_set { "set" } else { "missing" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::store_with;

    #[tokio::test]
    async fn test_collect_counts_chunks() {
        let store = store_with(&[("A", "1", "x"), ("B", "2", "y")]).await;
        let report = HealthReport::collect(&Settings::default(), Some(store.as_ref()), false).await;
        assert_eq!(report.indexed_chunks, Some(2));
        assert_eq!(report.retrieval_k, 3);
        assert!(report.to_string().contains("Indexed chunks:    2"));
        assert!(report.to_string().ends_with("missing"));
    }

    #[tokio::test]
    async fn test_unopened_index_reports_unknown() {
        let report = HealthReport::collect(&Settings::default(), None, true).await;
        assert_eq!(report.indexed_chunks, None);
        assert!(report.to_string().contains("Indexed chunks:    unknown"));
        assert!(report.to_string().ends_with("set"));
    }
}
