//! Retrieval-augmented answering for the coffee learning portal
//!
//! This crate holds the orchestration between a user question and a cited
//! answer: query expansion, prompt routing, evidence formatting, the
//! single-pass retriever-answerer, the researcher → synthesizer → critic
//! pipeline, citation utilities, and the offline ingestion path that fills
//! the local similarity index.

pub mod agents;
pub mod citations;
pub mod embeddings;
pub mod evidence;
pub mod expander;
pub mod health;
pub mod ingest;
pub mod prompts;
pub mod retriever;
pub mod vector_store;

#[cfg(test)]
mod testing;

pub use agents::{AgentPipeline, AgentRun, Extraction};
pub use citations::{count_citations, highlight_citations, map_citations};
pub use embeddings::HashEmbedder;
pub use evidence::{build_evidence, format_context, EvidenceEntry};
pub use expander::expand_queries;
pub use health::HealthReport;
pub use ingest::{IngestReport, Ingestor, SourceLoader, SourceValidator, TextSplitter};
pub use prompts::{route_prompt, PromptKind};
pub use retriever::{Answer, Retriever};
pub use vector_store::LocalVectorStore;

// Re-export core types for convenience
pub use brew_core::{
    Document, Embedder, Error, LLMProvider, Result, RetrievalResult, SearchConfig, SearchResult,
    VectorStore,
};
