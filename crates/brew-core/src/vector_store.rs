//! Vector store and embedder traits

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Document, Result};

/// A document returned by a similarity search, with its score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub document: Document,
    pub score: f32,
}

/// Search result from vector store, ordered by descending score
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
    pub hits: Vec<SearchHit>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.hits.into_iter().map(|h| h.document).collect()
    }
}

/// Configuration for vector search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub top_k: usize,
    pub score_threshold: Option<f32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            score_threshold: None,
        }
    }
}

impl SearchConfig {
    pub fn top_k(top_k: usize) -> Self {
        Self {
            top_k,
            ..Default::default()
        }
    }
}

/// Trait for turning text into dense vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts; output order matches input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| crate::Error::Embedding("embedder returned no vector".to_string()))
    }

    /// Identifier of the embedding model
    fn model_id(&self) -> &str;
}

/// Trait for similarity indexes
///
/// Query time only calls `search`; ingestion is the only writer.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and upsert documents, returning how many were written
    async fn add_documents(&self, documents: Vec<Document>) -> Result<usize>;

    /// Search for the documents most similar to `query`
    async fn search(&self, query: &str, config: &SearchConfig) -> Result<SearchResult>;

    /// Flush pending writes to durable storage
    async fn persist(&self) -> Result<()>;

    /// Remove every document
    async fn clear(&self) -> Result<()>;

    /// Get the total number of indexed chunks
    async fn count(&self) -> Result<usize>;
}
