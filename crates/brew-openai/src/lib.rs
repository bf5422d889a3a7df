//! OpenAI-compatible model clients for the coffee learning portal
//!
//! This crate provides the chat-completion implementation of the
//! `LLMProvider` trait and an HTTP implementation of the `Embedder` trait.

mod client;
mod config;
mod embeddings;


pub use client::OpenAIClient;
pub use config::OpenAIConfig;
pub use embeddings::OpenAIEmbedder;

// Re-export core types for convenience
pub use brew_core::{
    Embedder, Error, GenerationConfig, GenerationResult, LLMProvider, Result, RetryConfig,
};
