//! In-process fakes shared by the unit tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use brew_core::{
    Document, Error, GenerationConfig, GenerationResult, LLMProvider, Result, SearchConfig,
    SearchResult, VectorStore,
};

use crate::{HashEmbedder, LocalVectorStore};

/// Scripted language model: replies in order, then empty strings
pub struct FakeLlm {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    fail: bool,
}

impl FakeLlm {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::<String>::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for FakeLlm {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult> {
        self.generate_with_config(prompt, &GenerationConfig::default()).await
    }

    async fn generate_with_config(
        &self,
        prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<GenerationResult> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(Error::LLMProvider("model unavailable".to_string()));
        }
        let text = self.replies.lock().unwrap().pop_front().unwrap_or_default();
        Ok(GenerationResult {
            text,
            model_id: "fake".to_string(),
            tokens_used: None,
        })
    }

    fn model_id(&self) -> &str {
        "fake"
    }
}

/// In-memory index holding `(title, id, text)` passages
pub async fn store_with(passages: &[(&str, &str, &str)]) -> Arc<dyn VectorStore> {
    let store = LocalVectorStore::in_memory(Arc::new(HashEmbedder::new()));
    let documents = passages
        .iter()
        .map(|(title, id, text)| Document::new(*text).with_meta("title", *title).with_meta("id", *id))
        .collect();
    store.add_documents(documents).await.unwrap();
    Arc::new(store)
}

/// Store whose searches fail whenever the query contains `needle`
pub fn failing_on(inner: Arc<dyn VectorStore>, needle: &str) -> Arc<dyn VectorStore> {
    Arc::new(FailingStore {
        inner,
        needle: needle.to_string(),
    })
}

struct FailingStore {
    inner: Arc<dyn VectorStore>,
    needle: String,
}

#[async_trait]
impl VectorStore for FailingStore {
    async fn add_documents(&self, documents: Vec<Document>) -> Result<usize> {
        self.inner.add_documents(documents).await
    }

    async fn search(&self, query: &str, config: &SearchConfig) -> Result<SearchResult> {
        if query.contains(&self.needle) {
            return Err(Error::Network("connection reset".to_string()));
        }
        self.inner.search(query, config).await
    }

    async fn persist(&self) -> Result<()> {
        self.inner.persist().await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }

    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }
}
