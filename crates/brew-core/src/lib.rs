//! Core traits and types for the coffee learning portal
//!
//! This crate defines the types shared across the workspace: documents and
//! retrieval results, the capability traits for language models, embedders and
//! vector stores, the settings file, and the common error type. Keeping the
//! traits here lets the orchestration crates be tested with in-process fakes.

pub mod document;
pub mod error;
pub mod llm;
pub mod settings;
pub mod vector_store;

pub use document::{Document, DocumentKey, Metadata, RetrievalResult};
pub use error::{Error, Result};
pub use llm::{GenerationConfig, GenerationResult, LLMProvider, RetryConfig};
pub use settings::Settings;
pub use vector_store::{Embedder, SearchConfig, SearchResult, VectorStore};
