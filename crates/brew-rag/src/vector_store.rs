//! File-backed similarity index
//!
//! Chunks and their embeddings live in memory and are written as one JSON
//! file on `persist`. Chunks are keyed by a digest of `(id, content)`, so
//! ingesting the same sources twice replaces rather than duplicates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use brew_core::vector_store::SearchHit;
use brew_core::{Document, Embedder, Error, Metadata, Result, SearchConfig, SearchResult, VectorStore};

const EMBED_BATCH: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexedChunk {
    key: String,
    page_content: String,
    #[serde(default)]
    metadata: Metadata,
    embedding: Vec<f32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    embedding_model: String,
    dimension: usize,
    chunks: Vec<IndexedChunk>,
}

/// Local vector store persisted to a single JSON file
pub struct LocalVectorStore {
    path: Option<PathBuf>,
    embedder: Arc<dyn Embedder>,
    index: RwLock<IndexFile>,
}

impl LocalVectorStore {
    /// Open the index at `path`, loading existing chunks when the file exists
    pub fn open(path: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let path = path.into();
        let index = if path.exists() {
            let index = Self::load(&path)?;
            if !index.chunks.is_empty() && index.embedding_model != embedder.model_id() {
                warn!(
                    indexed_with = %index.embedding_model,
                    querying_with = %embedder.model_id(),
                    "Index was built with a different embedding model; re-ingest to refresh it"
                );
            }
            info!(path = %path.display(), chunks = index.chunks.len(), "Loaded vector index");
            index
        } else {
            debug!(path = %path.display(), "No vector index on disk yet");
            IndexFile::default()
        };

        Ok(Self {
            path: Some(path),
            embedder,
            index: RwLock::new(index),
        })
    }

    /// Index that is never written to disk
    pub fn in_memory(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            path: None,
            embedder,
            index: RwLock::new(IndexFile::default()),
        }
    }

    /// Where the index is persisted, if anywhere
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn load(path: &Path) -> Result<IndexFile> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            Error::VectorStore(format!("corrupt index at {}: {}", path.display(), e))
        })
    }

    fn poisoned() -> Error {
        Error::VectorStore("index lock poisoned".to_string())
    }

    fn chunk_key(document: &Document) -> String {
        let identity = format!("{}\u{0}{}", document.id(), document.page_content);
        format!("{:x}", md5::compute(identity.as_bytes()))
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn add_documents(&self, documents: Vec<Document>) -> Result<usize> {
        let mut embedded = Vec::with_capacity(documents.len());
        for batch in documents.chunks(EMBED_BATCH) {
            let texts: Vec<String> = batch.iter().map(|d| d.page_content.clone()).collect();
            let vectors = self.embedder.embed(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(Error::Embedding(format!(
                    "expected {} vectors, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            embedded.extend(batch.iter().cloned().zip(vectors));
        }

        let mut index = self.index.write().map_err(|_| Self::poisoned())?;
        index.embedding_model = self.embedder.model_id().to_string();
        let written = embedded.len();
        let mut positions: HashMap<String, usize> = index
            .chunks
            .iter()
            .enumerate()
            .map(|(i, c)| (c.key.clone(), i))
            .collect();

        for (document, embedding) in embedded {
            index.dimension = embedding.len();
            let key = Self::chunk_key(&document);
            let chunk = IndexedChunk {
                key: key.clone(),
                page_content: document.page_content,
                metadata: document.metadata,
                embedding,
            };
            match positions.get(&key) {
                Some(&i) => index.chunks[i] = chunk,
                None => {
                    positions.insert(key, index.chunks.len());
                    index.chunks.push(chunk);
                }
            }
        }

        debug!(written, total = index.chunks.len(), "Upserted chunks");
        Ok(written)
    }

    async fn search(&self, query: &str, config: &SearchConfig) -> Result<SearchResult> {
        let query_embedding = self.embedder.embed_query(query).await?;

        let index = self.index.read().map_err(|_| Self::poisoned())?;
        let mut scored: Vec<(f32, &IndexedChunk)> = index
            .chunks
            .iter()
            .map(|chunk| (cosine_similarity(&query_embedding, &chunk.embedding), chunk))
            .filter(|(score, _)| config.score_threshold.is_none_or(|t| *score >= t))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let hits = scored
            .into_iter()
            .take(config.top_k)
            .map(|(score, chunk)| SearchHit {
                document: Document {
                    page_content: chunk.page_content.clone(),
                    metadata: chunk.metadata.clone(),
                },
                score,
            })
            .collect();

        Ok(SearchResult { hits })
    }

    async fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let content = {
            let index = self.index.read().map_err(|_| Self::poisoned())?;
            serde_json::to_string(&*index)?
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await?;
        info!(path = %path.display(), "Persisted vector index");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut index = self.index.write().map_err(|_| Self::poisoned())?;
        index.chunks.clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let index = self.index.read().map_err(|_| Self::poisoned())?;
        Ok(index.chunks.len())
    }
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot / (magnitude_a * magnitude_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HashEmbedder;
    use tempfile::TempDir;

    fn passage(title: &str, id: &str, text: &str) -> Document {
        Document::new(text).with_meta("title", title).with_meta("id", id)
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-3);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-3);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_ranks_relevant_passage_first() {
        let store = LocalVectorStore::in_memory(Arc::new(HashEmbedder::new()));
        store
            .add_documents(vec![
                passage("Milk", "m", "steamed milk microfoam texture for latte art"),
                passage("Sour", "s", "sour espresso means under extraction grind finer"),
                passage("Origins", "o", "ethiopian washed coffees taste floral"),
            ])
            .await
            .unwrap();

        let result = store
            .search("why is my espresso sour", &SearchConfig::top_k(2))
            .await
            .unwrap();
        assert_eq!(result.hits.len(), 2);
        assert_eq!(result.hits[0].document.id(), "s");
        assert!(result.hits[0].score >= result.hits[1].score);
    }

    #[tokio::test]
    async fn test_reingest_is_idempotent() {
        let store = LocalVectorStore::in_memory(Arc::new(HashEmbedder::new()));
        let docs = vec![passage("A", "a@1", "bloom"), passage("B", "b@1", "pour")];
        store.add_documents(docs.clone()).await.unwrap();
        store.add_documents(docs).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicates_within_one_batch_collapse() {
        let store = LocalVectorStore::in_memory(Arc::new(HashEmbedder::new()));
        let written = store
            .add_documents(vec![
                passage("A", "a@1", "bloom"),
                passage("A", "a@1", "bloom"),
                passage("B", "b@1", "pour"),
            ])
            .await
            .unwrap();
        assert_eq!(written, 3);
        assert_eq!(store.count().await.unwrap(), 2);

        store.add_documents(vec![passage("C", "c@1", "drawdown")]).await.unwrap();
        store.add_documents(vec![passage("B", "b@1", "pour")]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_persist_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db").join("index.json");
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new());

        let store = LocalVectorStore::open(&path, embedder.clone()).unwrap();
        store
            .add_documents(vec![passage("Tamping", "t@2", "level tamp")])
            .await
            .unwrap();
        store.persist().await.unwrap();

        let reopened = LocalVectorStore::open(&path, embedder).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
        let hits = reopened
            .search("tamp", &SearchConfig::top_k(3))
            .await
            .unwrap();
        assert_eq!(hits.hits[0].document.title(), "Tamping");
    }

    #[tokio::test]
    async fn test_corrupt_index_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, "not json").unwrap();
        let result = LocalVectorStore::open(&path, Arc::new(HashEmbedder::new()));
        assert!(matches!(result, Err(Error::VectorStore(_))));
    }

    #[tokio::test]
    async fn test_clear_and_empty_search() {
        let store = LocalVectorStore::in_memory(Arc::new(HashEmbedder::new()));
        store.add_documents(vec![passage("A", "1", "x")]).await.unwrap();
        store.clear().await.unwrap();
        let result = store.search("x", &SearchConfig::default()).await.unwrap();
        assert!(result.is_empty());
    }
}
