//! Heuristic query expansion for the research stage

/// One expansion rule: if any keyword occurs in the lowered question, the
/// suffix is appended to form the extra query.
struct ExpansionRule {
    keywords: &'static [&'static str],
    suffix: &'static str,
}

/// Evaluated top to bottom; the first matching rule wins.
const EXPANSION_RULES: &[ExpansionRule] = &[
    ExpansionRule {
        keywords: &["why", "cause", "reason", "sour", "bitter", "channel"],
        suffix: "cause",
    },
    ExpansionRule {
        keywords: &["difference", "vs", "compare", "comparison"],
        suffix: "key differences",
    },
];

const DEFAULT_SUFFIX: &str = "overview";

/// Expand a question into exactly two queries: the question itself, then one
/// derived variant. Kept to two so a multi-agent run stays at two lookups.
pub fn expand_queries(question: &str) -> Vec<String> {
    let lowered = question.to_lowercase();
    let suffix = EXPANSION_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| lowered.contains(k)))
        .map_or(DEFAULT_SUFFIX, |rule| rule.suffix);

    vec![question.to_string(), format!("{} {}", question, suffix)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_causal_questions_get_cause_variant() {
        assert_eq!(
            expand_queries("Why does espresso taste sour?"),
            vec![
                "Why does espresso taste sour?".to_string(),
                "Why does espresso taste sour? cause".to_string(),
            ]
        );
    }

    #[test]
    fn test_comparison_questions_get_differences_variant() {
        let queries = expand_queries("Compare V60 and Chemex");
        assert_eq!(queries[1], "Compare V60 and Chemex key differences");
    }

    #[test]
    fn test_causal_rule_wins_over_comparison() {
        let queries = expand_queries("Why is there a difference in bitterness?");
        assert_eq!(queries[1], "Why is there a difference in bitterness? cause");
    }

    #[test]
    fn test_default_variant_is_overview() {
        let queries = expand_queries("What is a flat white?");
        assert_eq!(queries[1], "What is a flat white? overview");
    }

    #[test]
    fn test_always_two_queries_with_original_first() {
        for q in ["", "   ", "WHY", "latte vs cappuccino", "Ethiopian naturals", "ρ coffee"] {
            let queries = expand_queries(q);
            assert_eq!(queries.len(), 2);
            assert_eq!(queries[0], q);
        }
    }
}
