//! Single-pass retriever-answerer ("standard" mode)

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use brew_core::{LLMProvider, Result, RetrievalResult, SearchConfig, VectorStore};

use crate::evidence::format_context;
use crate::prompts::{route_prompt, PromptKind};

pub const DEFAULT_K: usize = 3;

/// A single-pass answer. `route` is `None` when the index returned nothing
/// and the advisory message was returned without calling the model.
#[derive(Debug, Clone)]
pub struct Answer {
    pub route: Option<PromptKind>,
    pub retrieval: RetrievalResult,
}

/// One retrieval followed by one generation call
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LLMProvider>,
    k: AtomicUsize,
    index_location: String,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStore>, llm: Arc<dyn LLMProvider>) -> Self {
        Self {
            store,
            llm,
            k: AtomicUsize::new(DEFAULT_K),
            index_location: "the configured persist directory".to_string(),
        }
    }

    pub fn with_k(self, k: usize) -> Self {
        self.set_k(k);
        self
    }

    /// Name the index location in the empty-index advisory
    pub fn with_index_location(mut self, location: impl Into<String>) -> Self {
        self.index_location = location.into();
        self
    }

    pub fn k(&self) -> usize {
        self.k.load(Ordering::Relaxed)
    }

    /// Change the retrieval fan-out for subsequent calls. Zero is raised to one.
    pub fn set_k(&self, k: usize) {
        self.k.store(k.max(1), Ordering::Relaxed);
    }

    /// Advisory returned when the index holds nothing relevant
    pub fn empty_index_message(&self) -> String {
        format!(
            "No documents found in the vector store. Run `brew ingest` to ingest your sources into {}.",
            self.index_location
        )
    }

    /// Retrieve, route, prompt, generate
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let k = self.k();
        let documents = self
            .store
            .search(question, &SearchConfig::top_k(k))
            .await?
            .into_documents();

        if documents.is_empty() {
            info!(question, "Retrieval returned no documents");
            return Ok(Answer {
                route: None,
                retrieval: RetrievalResult::new(self.empty_index_message(), Vec::new()),
            });
        }

        let route = route_prompt(question);
        let context = format_context(&documents, k);
        let prompt = route.render(question, &context);
        debug!(%route, k, retrieved = documents.len(), "Generating single-pass answer");

        let generated = self.llm.generate(&prompt).await?;
        let source_documents = documents.into_iter().take(k).collect();

        Ok(Answer {
            route: Some(route),
            retrieval: RetrievalResult::new(generated.text, source_documents),
        })
    }

    /// Same as [`Retriever::answer`] without the routing detail
    pub async fn qa(&self, question: &str) -> Result<RetrievalResult> {
        Ok(self.answer(question).await?.retrieval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{store_with, FakeLlm};

    #[tokio::test]
    async fn test_empty_index_returns_advisory_without_generation() {
        let llm = Arc::new(FakeLlm::new(["unused"]));
        let retriever = Retriever::new(store_with(&[]).await, llm.clone())
            .with_index_location("./chroma_db");

        let answer = retriever.answer("What is crema?").await.unwrap();
        assert!(answer.route.is_none());
        assert!(answer.retrieval.source_documents.is_empty());
        assert!(answer.retrieval.result.contains("brew ingest"));
        assert!(answer.retrieval.result.contains("./chroma_db"));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_sources_bounded_by_k() {
        let store = store_with(&[
            ("A", "a", "espresso dose"),
            ("B", "b", "espresso yield"),
            ("C", "c", "espresso time"),
            ("D", "d", "espresso temperature"),
        ])
        .await;
        let llm = Arc::new(FakeLlm::new(["Dose 18g [1]."]));
        let retriever = Retriever::new(store, llm.clone()).with_k(2);

        let result = retriever.qa("espresso dose").await.unwrap();
        assert_eq!(result.result, "Dose 18g [1].");
        assert_eq!(result.source_documents.len(), 2);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_runtime_k_adjustment() {
        let retriever = Retriever::new(store_with(&[]).await, Arc::new(FakeLlm::new([""])));
        assert_eq!(retriever.k(), DEFAULT_K);
        retriever.set_k(5);
        assert_eq!(retriever.k(), 5);
        retriever.set_k(0);
        assert_eq!(retriever.k(), 1);
    }

    #[tokio::test]
    async fn test_generation_error_propagates() {
        let store = store_with(&[("A", "a", "latte milk")]).await;
        let retriever = Retriever::new(store, Arc::new(FakeLlm::failing()));
        assert!(retriever.answer("latte").await.is_err());
    }

    #[tokio::test]
    async fn test_generated_text_is_returned_verbatim() {
        let store = store_with(&[("A", "a", "crema colour")]).await;
        let retriever = Retriever::new(store, Arc::new(FakeLlm::new(["\nTiger striping [1].\n"])));
        let result = retriever.qa("crema").await.unwrap();
        assert_eq!(result.result, "\nTiger striping [1].\n");
    }

    #[tokio::test]
    async fn test_prompt_carries_numbered_context() {
        let store = store_with(&[("Milk Guide", "milk@3", "microfoam for flat white")]).await;
        let llm = Arc::new(FakeLlm::new(["ok"]));
        let retriever = Retriever::new(store, llm.clone());

        retriever.answer("flat white texture").await.unwrap();
        let prompt = llm.prompts().remove(0);
        assert!(prompt.contains("[1] (Milk Guide - id:milk@3)\nmicrofoam for flat white"));
        assert!(prompt.contains("Question: flat white texture"));
    }
}
