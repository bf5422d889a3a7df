//! Offline hashed bag-of-words embedder
//!
//! Lets the portal index and search without an embedding service. Vectors are
//! stable across runs and machines because features are placed with md5
//! rather than the process-seeded std hasher.

use async_trait::async_trait;
use brew_core::{Embedder, Result};

pub const HASH_EMBEDDING_DIM: usize = 384;
pub const HASH_EMBEDDER_ID: &str = "hash-384";

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
    model_id: String,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self::with_dimension(HASH_EMBEDDING_DIM)
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            model_id: format!("hash-{}", dimension.max(1)),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn bucket(&self, token: &str, shift: u32) -> usize {
        let digest = md5::compute(token.as_bytes());
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&digest.0[..8]);
        let hash = u64::from_le_bytes(raw);
        ((hash >> shift) % self.dimension as u64) as usize
    }

    /// Embed one text: unigrams land in three buckets weighted by position,
    /// bigrams in one. The result is L2-normalized.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let normalized = text.to_lowercase();
        let words: Vec<&str> = normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let mut vector = vec![0.0f32; self.dimension];

        for (pos, word) in words.iter().enumerate() {
            // Slow decay so long chunks still weigh their later words
            let weight = 1.0 / (1.0 + pos as f32 / 50.0);
            vector[self.bucket(word, 0)] += weight;
            vector[self.bucket(word, 16)] += weight * 0.7;
            vector[self.bucket(word, 32)] += weight * 0.5;
        }

        for pair in words.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            vector[self.bucket(&bigram, 0)] += 0.8;
        }

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for v in vector.iter_mut() {
                *v /= magnitude;
            }
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_and_model_id() {
        let embedder = HashEmbedder::new();
        assert_eq!(embedder.dimension(), HASH_EMBEDDING_DIM);
        assert_eq!(embedder.model_id(), HASH_EMBEDDER_ID);
        assert_eq!(embedder.embed_text("crema").len(), HASH_EMBEDDING_DIM);
    }

    #[test]
    fn test_embedding_is_stable_and_normalized() {
        let embedder = HashEmbedder::new();
        let a = embedder.embed_text("Espresso extraction time");
        let b = embedder.embed_text("espresso EXTRACTION time");
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::with_dimension(16);
        assert!(embedder.embed_text("  ").iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let embedder = HashEmbedder::new();
        let texts = vec!["milk".to_string(), "grind".to_string()];
        let vectors = embedder.embed(&texts).await.unwrap();
        assert_eq!(vectors[0], embedder.embed_text("milk"));
        assert_eq!(vectors[1], embedder.embed_text("grind"));
    }
}
