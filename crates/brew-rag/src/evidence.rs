//! Evidence blocks and retrieval context formatting
//!
//! Both renderers number passages in first-seen order. The evidence block is a
//! pure function of the order of its input results: rebuilding it from the
//! same results always produces the same numbering.

use std::collections::HashSet;

use brew_core::{Document, DocumentKey, RetrievalResult};

/// Excerpt budget for the agent pipeline's evidence block
pub const AGENT_EXCERPT_CHARS: usize = 450;

/// Snippet budget for single-pass retrieval context
pub const CONTEXT_SNIPPET_CHARS: usize = 900;

pub const EVIDENCE_HEADER: &str = "EVIDENCE (use only what follows; cite by bracket number):";

/// One numbered passage of an evidence block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceEntry {
    pub number: usize,
    pub title: String,
    pub id: String,
    pub excerpt: String,
}

/// Prefix of `text` holding at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Flatten the source documents of every result, keeping the first
/// occurrence of each `(title, id)`.
pub fn collect_evidence(results: &[RetrievalResult], max_chars: usize) -> Vec<EvidenceEntry> {
    let mut seen: HashSet<DocumentKey> = HashSet::new();
    let mut entries = Vec::new();

    for doc in results.iter().flat_map(|r| r.source_documents.iter()) {
        let key = doc.key();
        if !seen.insert(key.clone()) {
            continue;
        }
        entries.push(EvidenceEntry {
            number: entries.len() + 1,
            title: key.title,
            id: key.id,
            excerpt: truncate_chars(&doc.page_content, max_chars).to_string(),
        });
    }

    entries
}

/// Render the numbered, deduplicated evidence block handed to the agents
pub fn build_evidence(results: &[RetrievalResult], max_chars: usize) -> String {
    let body = collect_evidence(results, max_chars)
        .iter()
        .map(|e| format!("[{}] {} (id:{})\n{}", e.number, e.title, e.id, e.excerpt))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{}\n{}", EVIDENCE_HEADER, body)
}

/// Format the top `k` retrieved documents into the single-pass context block
pub fn format_context(documents: &[Document], k: usize) -> String {
    documents
        .iter()
        .take(k)
        .enumerate()
        .map(|(i, doc)| {
            format!(
                "[{}] ({} - id:{})\n{}",
                i + 1,
                doc.title(),
                doc.id(),
                truncate_chars(&doc.page_content, CONTEXT_SNIPPET_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
