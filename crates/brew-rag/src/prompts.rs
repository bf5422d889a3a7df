//! Prompt templates and question routing
//!
//! Every template shares the same system rules and question/context header,
//! followed by CLEAR instructions (Concise, Logical, Explicit, Adaptive,
//! Reflective) tuned to the kind of question being asked.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which answer template a question is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    Factual,
    Troubleshoot,
    Comparative,
    Synthesis,
}

struct RouteRule {
    keywords: &'static [&'static str],
    kind: PromptKind,
}

/// Evaluated top to bottom; the first matching rule wins. A question that
/// mentions both "why" and "difference" is a troubleshooting question.
const ROUTE_RULES: &[RouteRule] = &[
    RouteRule {
        keywords: &["why", "cause", "sour", "bitter", "channel", "fix", "troubleshoot"],
        kind: PromptKind::Troubleshoot,
    },
    RouteRule {
        keywords: &["difference", "vs", "compare", "comparison"],
        kind: PromptKind::Comparative,
    },
    RouteRule {
        keywords: &["how does", "affect", "impact", "across", "in different"],
        kind: PromptKind::Synthesis,
    },
];

/// Pick the template for a question
pub fn route_prompt(question: &str) -> PromptKind {
    let lowered = question.to_lowercase();
    ROUTE_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| lowered.contains(k)))
        .map_or(PromptKind::Factual, |rule| rule.kind)
}

pub const SYSTEM_RULES: &str = "\
You are a precise and trustworthy coffee educator.
Rely ONLY on the provided context drawn from verified coffee-learning sources.
If the context lacks the answer, say exactly:
\"I don't know from the provided sources.\"

Use clear, direct language suitable for a learner exploring coffee preparation,
tasting, and brewing techniques. Avoid speculation or creative writing.";

const FACTUAL_INSTRUCTIONS: &str = "\
[C] Concise
Answer directly in 2-4 sentences using simple language.

[L] Logical
Start with the main fact, then any supporting detail or range.

[E] Explicit
Cite sources using [1], [2] based on order in context.
Avoid adding external knowledge.

[A] Adaptive
If unsure or context lacks numeric detail, respond:
\"I don't know from the provided sources.\"

[R] Reflective
Check that each fact comes from context and citations are correct.";

const TROUBLESHOOT_INSTRUCTIONS: &str = "\
[C] Concise
Explain the most likely cause first, then suggest 2-3 corrective steps.

[L] Logical
Use numbered steps or a short cause -> effect -> solution sequence.

[E] Explicit
Cite sources [1], [2]. Limit to 5 sentences or fewer.

[A] Adaptive
If multiple possible issues appear in context, list each briefly.

[R] Reflective
Confirm that steps are realistic and derived from provided sources.";

const COMPARATIVE_INSTRUCTIONS: &str = "\
[C] Concise
Summarize both sides (A vs B) in balanced terms.

[L] Logical
Structure response as:
1. Definition or key trait of A
2. Definition or key trait of B
3. Summary difference or recommendation

[E] Explicit
Cite [1], [2] as needed. Keep under 5 sentences.

[A] Adaptive
If more than two items are compared, use a short bullet or table style.

[R] Reflective
Verify that contrasts come from the given context only.";

const SYNTHESIS_INSTRUCTIONS: &str = "\
[C] Concise
Integrate key ideas from multiple context snippets in 3-5 sentences.

[L] Logical
Follow cause -> process -> result flow.

[E] Explicit
Cite each relevant context piece with [1], [2], etc.

[A] Adaptive
If context mentions multiple methods, summarize their relationships.

[R] Reflective
Ensure synthesis connects all cited sources logically and factually.";

impl PromptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptKind::Factual => "factual",
            PromptKind::Troubleshoot => "troubleshoot",
            PromptKind::Comparative => "comparative",
            PromptKind::Synthesis => "synthesis",
        }
    }

    fn instructions(&self) -> &'static str {
        match self {
            PromptKind::Factual => FACTUAL_INSTRUCTIONS,
            PromptKind::Troubleshoot => TROUBLESHOOT_INSTRUCTIONS,
            PromptKind::Comparative => COMPARATIVE_INSTRUCTIONS,
            PromptKind::Synthesis => SYNTHESIS_INSTRUCTIONS,
        }
    }

    /// Fill the template with the question and the formatted context
    pub fn render(&self, question: &str, context: &str) -> String {
        format!(
            "{}\n\nQuestion: {}\n\nContext (retrieved excerpts from the knowledge base):\n{}\n\n{}\n\nFinal Answer:",
            SYSTEM_RULES,
            question,
            context,
            self.instructions()
        )
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_troubleshoot_keywords() {
        assert_eq!(route_prompt("Why does espresso taste sour?"), PromptKind::Troubleshoot);
        assert_eq!(route_prompt("How do I fix channeling?"), PromptKind::Troubleshoot);
        assert_eq!(route_prompt("My shot is BITTER"), PromptKind::Troubleshoot);
    }

    #[test]
    fn test_troubleshoot_precedes_comparative() {
        for q in [
            "Why is there a difference between washed and natural?",
            "Compare the causes of sour shots",
            "latte vs cappuccino: which one is more bitter?",
        ] {
            assert_eq!(route_prompt(q), PromptKind::Troubleshoot, "{}", q);
        }
    }

    #[test]
    fn test_comparative_keywords() {
        assert_eq!(
            route_prompt("What is the difference between latte and cappuccino?"),
            PromptKind::Comparative
        );
        assert_eq!(route_prompt("V60 vs Kalita"), PromptKind::Comparative);
    }

    #[test]
    fn test_synthesis_keywords() {
        assert_eq!(
            route_prompt("How does water temperature affect extraction in pour-over methods?"),
            PromptKind::Synthesis
        );
        assert_eq!(
            route_prompt("How do various brewing methods highlight different coffee origins in different ways?"),
            PromptKind::Synthesis
        );
    }

    #[test]
    fn test_factual_default() {
        assert_eq!(
            route_prompt("What is the optimal coffee-to-water ratio for V60 brewing?"),
            PromptKind::Factual
        );
    }

    #[test]
    fn test_render_places_question_and_context() {
        let prompt = PromptKind::Comparative.render("Latte or flat white?", "[1] (Milk - id:m1)\nfoam");
        assert!(prompt.starts_with("You are a precise and trustworthy coffee educator."));
        assert!(prompt.contains("Question: Latte or flat white?"));
        assert!(prompt.contains("knowledge base):\n[1] (Milk - id:m1)\nfoam\n\n[C] Concise\nSummarize both sides"));
        assert!(prompt.ends_with("Final Answer:"));
    }
}
