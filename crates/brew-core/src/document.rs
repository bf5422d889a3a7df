//! Documents and retrieval results

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// String metadata attached to a document (title, source, id, page, ...)
pub type Metadata = BTreeMap<String, String>;

/// A unit of ingested text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub page_content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Builder-style metadata insertion
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Metadata value, treating empty strings as absent
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Display title: `title`, then `source`, then "Unknown"
    pub fn title(&self) -> &str {
        self.meta("title")
            .or_else(|| self.meta("source"))
            .unwrap_or("Unknown")
    }

    /// Source identifier, "?" when missing
    pub fn id(&self) -> &str {
        self.meta("id").unwrap_or("?")
    }

    /// Identity used to deduplicate passages in an evidence block
    pub fn key(&self) -> DocumentKey {
        DocumentKey {
            title: self.title().to_string(),
            id: self.id().to_string(),
        }
    }
}

/// `(title, id)` identity of a document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentKey {
    pub title: String,
    pub id: String,
}

/// Output of one retrieval + generation call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub result: String,
    #[serde(default)]
    pub source_documents: Vec<Document>,
}

impl RetrievalResult {
    pub fn new(result: impl Into<String>, source_documents: Vec<Document>) -> Self {
        Self {
            result: result.into(),
            source_documents,
        }
    }

    /// Placeholder recorded when a research lookup fails
    pub fn lookup_failed(query: &str, error: impl std::fmt::Display) -> Self {
        Self::new(format!("(lookup failed for '{}': {})", query, error), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_falls_back_to_source_then_unknown() {
        let doc = Document::new("text").with_meta("source", "guide.pdf");
        assert_eq!(doc.title(), "guide.pdf");

        let doc = Document::new("text").with_meta("title", "").with_meta("source", "a.pdf");
        assert_eq!(doc.title(), "a.pdf");

        let doc = Document::new("text");
        assert_eq!(doc.title(), "Unknown");
        assert_eq!(doc.id(), "?");
    }

    #[test]
    fn test_key_uses_title_and_id() {
        let doc = Document::new("text")
            .with_meta("title", "SCA Brewing")
            .with_meta("id", "sca@3");
        assert_eq!(
            doc.key(),
            DocumentKey {
                title: "SCA Brewing".to_string(),
                id: "sca@3".to_string(),
            }
        );
    }

    #[test]
    fn test_lookup_failed_placeholder() {
        let r = RetrievalResult::lookup_failed("espresso cause", "timeout");
        assert_eq!(r.result, "(lookup failed for 'espresso cause': timeout)");
        assert!(r.source_documents.is_empty());
    }
}
