//! Researcher → Synthesizer → Critic pipeline ("multi-agent" mode)

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use brew_core::{LLMProvider, Result, RetrievalResult};

use crate::evidence::{build_evidence, AGENT_EXCERPT_CHARS};
use crate::expander::expand_queries;
use crate::retriever::Retriever;

const REVISED_MARKER: &str = "revised answer";

/// Where the final answer of a run came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "text", rename_all = "snake_case")]
pub enum Extraction {
    /// Text following the "Revised Answer" marker
    Extracted(String),
    /// Whole critic output
    FallbackCritic(String),
    /// Critic returned nothing; the synthesizer draft stands
    FallbackDraft(String),
    /// Neither stage produced text
    Empty,
}

impl Extraction {
    pub fn text(&self) -> &str {
        match self {
            Extraction::Extracted(t) | Extraction::FallbackCritic(t) | Extraction::FallbackDraft(t) => t,
            Extraction::Empty => "",
        }
    }

    pub fn state(&self) -> &'static str {
        match self {
            Extraction::Extracted(_) => "extracted",
            Extraction::FallbackCritic(_) => "fallback_critic",
            Extraction::FallbackDraft(_) => "fallback_draft",
            Extraction::Empty => "empty",
        }
    }
}

/// Pull the final answer out of the critic's output.
///
/// The marker match is ASCII case-insensitive so byte offsets in the lowered
/// copy line up with the original text.
pub fn extract_revised_answer(critique: &str, draft: &str) -> Extraction {
    let critique = critique.trim();
    let draft = draft.trim();

    let lowered = critique.to_ascii_lowercase();
    if let Some(pos) = lowered.find(REVISED_MARKER) {
        let after = &critique[pos..];
        let revised = match after.split_once(':') {
            Some((_, rest)) => rest.trim(),
            None => after.trim(),
        };
        if !revised.is_empty() {
            return Extraction::Extracted(revised.to_string());
        }
    }

    if !critique.is_empty() {
        Extraction::FallbackCritic(critique.to_string())
    } else if !draft.is_empty() {
        Extraction::FallbackDraft(draft.to_string())
    } else {
        Extraction::Empty
    }
}

/// Orientation block of researcher answers, numbered by result position.
/// Every line repeats the user's question; blank answers are skipped.
pub fn mini_summaries(question: &str, results: &[RetrievalResult]) -> String {
    results
        .iter()
        .enumerate()
        .filter_map(|(i, r)| {
            let answer = r.result.trim();
            (!answer.is_empty()).then(|| format!("Q{n}: {question}\nA{n}: {answer}", n = i + 1))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn synthesizer_prompt(question: &str, results: &[RetrievalResult]) -> String {
    let evidence = build_evidence(results, AGENT_EXCERPT_CHARS);
    let summaries = mini_summaries(question, results);
    format!(
        "[C] CONCISE
You are a precise coffee educator. Produce a single, clear explanation.

[L] LOGICAL
Organize as short bullets or numbered steps when procedural.

[E] EXPLICIT
Use ONLY the EVIDENCE block below. Cite as [1], [2] matching the evidence numbers.
Do not invent sources or facts. Keep to 4-8 sentences.

[A] ADAPTIVE
If the question implies 'why/how', give cause -> effect -> fix. If 'compare', show A vs B.

[R] REFLECTIVE
Before finalizing, ensure every claim is supported by EVIDENCE and citations are present.

Question:
{question}

{evidence}

Relevant mini-summaries (for orientation only; do not cite these):
{summaries}

Final, grounded draft with bracket citations:"
    )
}

pub fn critic_prompt(question: &str, draft: &str, results: &[RetrievalResult]) -> String {
    let evidence = build_evidence(results, AGENT_EXCERPT_CHARS);
    format!(
        "You are reviewing a draft answer to ensure clarity and grounding.

Rules:
- Use ONLY the EVIDENCE block; do not add external facts.
- Keep or improve citations [1], [2].
- Prefer concise, instructional language (2-6 short paragraphs or steps).

Question:
{question}

{evidence}

Draft:
{draft}

Provide a 'Revised Answer' that is clearer and fully supported by the evidence.
Revised Answer:"
    )
}

/// Everything a pipeline run produced, final answer included
#[derive(Debug, Clone, Serialize)]
pub struct AgentRun {
    pub question: String,
    pub queries: Vec<String>,
    pub research: Vec<RetrievalResult>,
    pub draft: String,
    pub critique: String,
    pub extraction: Extraction,
}

impl AgentRun {
    pub fn answer(&self) -> &str {
        self.extraction.text()
    }

    /// Final answer paired with every researched passage
    pub fn into_retrieval(self) -> RetrievalResult {
        let answer = self.extraction.text().to_string();
        let sources = self
            .research
            .into_iter()
            .flat_map(|r| r.source_documents)
            .collect();
        RetrievalResult::new(answer, sources)
    }
}

pub struct AgentPipeline {
    retriever: Arc<Retriever>,
    llm: Arc<dyn LLMProvider>,
}

impl AgentPipeline {
    pub fn new(retriever: Arc<Retriever>, llm: Arc<dyn LLMProvider>) -> Self {
        Self { retriever, llm }
    }

    /// Run one single-pass lookup per query, in order. A failed lookup is
    /// recorded as a placeholder and the remaining queries still run.
    pub async fn research(&self, queries: &[String]) -> Vec<RetrievalResult> {
        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            match self.retriever.qa(query).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(query = %query, error = %e, "Research lookup failed");
                    results.push(RetrievalResult::lookup_failed(query, e));
                }
            }
        }
        results
    }

    pub async fn synthesize(&self, question: &str, results: &[RetrievalResult]) -> Result<String> {
        let prompt = synthesizer_prompt(question, results);
        Ok(self.llm.generate(&prompt).await?.text)
    }

    pub async fn critique(
        &self,
        question: &str,
        draft: &str,
        results: &[RetrievalResult],
    ) -> Result<String> {
        let prompt = critic_prompt(question, draft, results);
        Ok(self.llm.generate(&prompt).await?.text)
    }

    pub async fn run(&self, question: &str) -> Result<AgentRun> {
        let queries = expand_queries(question);
        debug!(?queries, "Expanded question");

        let research = self.research(&queries).await;
        let draft = self.synthesize(question, &research).await?.trim().to_string();
        let critique = self
            .critique(question, &draft, &research)
            .await?
            .trim()
            .to_string();
        let extraction = extract_revised_answer(&critique, &draft);

        info!(
            queries = queries.len(),
            extraction = extraction.state(),
            "Multi-agent run finished"
        );

        Ok(AgentRun {
            question: question.to_string(),
            queries,
            research,
            draft,
            critique,
            extraction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{failing_on, store_with, FakeLlm};

    #[test]
    fn test_extracts_text_after_marker() {
        let extraction = extract_revised_answer("Notes...\nRevised Answer: Grind finer [1].", "draft");
        assert_eq!(extraction, Extraction::Extracted("Grind finer [1].".to_string()));
    }

    #[test]
    fn test_marker_is_case_insensitive() {
        let extraction = extract_revised_answer("REVISED ANSWER:\n  Use 93C water [2].", "");
        assert_eq!(extraction.text(), "Use 93C water [2].");
    }

    #[test]
    fn test_marker_without_colon_keeps_marker_onward() {
        let extraction = extract_revised_answer("Here is the revised answer below", "draft");
        assert_eq!(
            extraction,
            Extraction::Extracted("revised answer below".to_string())
        );
    }

    #[test]
    fn test_empty_extraction_falls_back_to_critic() {
        let extraction = extract_revised_answer("Looks good. Revised Answer:   ", "draft");
        assert_eq!(
            extraction,
            Extraction::FallbackCritic("Looks good. Revised Answer:".to_string())
        );
    }

    #[test]
    fn test_missing_marker_uses_critic_text() {
        let extraction = extract_revised_answer("Tamp level and evenly [1].", "draft");
        assert!(matches!(extraction, Extraction::FallbackCritic(_)));
    }

    #[test]
    fn test_empty_critic_falls_back_to_draft_then_empty() {
        assert_eq!(
            extract_revised_answer("  ", "The draft [1]."),
            Extraction::FallbackDraft("The draft [1].".to_string())
        );
        assert_eq!(extract_revised_answer("", ""), Extraction::Empty);
        assert_eq!(Extraction::Empty.text(), "");
    }

    #[test]
    fn test_non_ascii_before_marker() {
        let extraction = extract_revised_answer("Café crème, Revised Answer: Steam to 60°C.", "");
        assert_eq!(extraction.text(), "Steam to 60°C.");
    }

    #[test]
    fn test_mini_summaries_use_original_question_and_position() {
        let results = vec![
            RetrievalResult::new("  ", vec![]),
            RetrievalResult::new("Grind finer.", vec![]),
        ];
        assert_eq!(
            mini_summaries("Why sour?", &results),
            "Q2: Why sour?\nA2: Grind finer."
        );
    }

    #[test]
    fn test_critic_prompt_ends_with_marker() {
        let prompt = critic_prompt("q", "d", &[]);
        assert!(prompt.ends_with("Revised Answer:"));
        assert!(prompt.contains("Draft:\nd\n"));
    }

    #[tokio::test]
    async fn test_failed_query_becomes_placeholder_and_batch_continues() {
        let store = failing_on(
            store_with(&[("Sour", "s@1", "sour espresso under extracted")]).await,
            "cause",
        );
        let llm = Arc::new(FakeLlm::new([
            "Under-extraction [1].",
            "Draft [1].",
            "Revised Answer: Grind finer [1].",
        ]));
        let retriever = Arc::new(Retriever::new(store, llm.clone()));
        let pipeline = AgentPipeline::new(retriever, llm.clone());

        let run = pipeline.run("Why does espresso taste sour?").await.unwrap();
        assert_eq!(run.queries.len(), 2);
        assert_eq!(run.research.len(), 2);
        assert_eq!(run.research[0].result, "Under-extraction [1].");
        assert!(
            run.research[1]
                .result
                .starts_with("(lookup failed for 'Why does espresso taste sour? cause':")
        );
        assert!(run.research[1].source_documents.is_empty());
        assert_eq!(run.answer(), "Grind finer [1].");
        assert_eq!(llm.calls(), 3);
    }

    #[tokio::test]
    async fn test_synthesizer_error_propagates() {
        let store = store_with(&[]).await;
        let retriever = Arc::new(Retriever::new(store, Arc::new(FakeLlm::new([""]))));
        let pipeline = AgentPipeline::new(retriever, Arc::new(FakeLlm::failing()));
        assert!(pipeline.run("What is a cortado?").await.is_err());
    }
}
