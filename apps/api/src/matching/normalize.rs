//! Text normalization and catalog skill extraction.

use std::collections::BTreeSet;

use crate::matching::catalog::SkillCatalog;

/// Sorted, deduplicated set of canonical skill names.
pub type SkillSet = BTreeSet<String>;

/// Lowercases, blanks out everything but `[a-z0-9]` and whitespace, then
/// applies the catalog's alias rules in order.
///
/// Alias rewriting is plain substring replacement: it is not word-bounded
/// (`"email"` contains `"ai"`) and an earlier rewrite can be rewritten again
/// by a later rule. Scores depend on this exact behaviour.
pub fn normalize(text: &str, catalog: &SkillCatalog) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    catalog
        .aliases
        .iter()
        .fold(cleaned, |text, (alias, canonical)| text.replace(alias, canonical))
}

/// Returns every catalog skill that occurs as a substring of `normalized`.
/// Not token-bounded: "java" is found inside "javascript".
pub fn extract_skills(normalized: &str, catalog: &SkillCatalog) -> SkillSet {
    catalog
        .skills
        .iter()
        .filter(|skill| normalized.contains(*skill))
        .map(|skill| skill.to_string())
        .collect()
}

/// A résumé or job description after normalization and skill extraction.
#[derive(Debug, Clone)]
pub struct Document {
    pub normalized: String,
    pub skills: SkillSet,
}

impl Document {
    pub fn derive(raw: &str, catalog: &SkillCatalog) -> Self {
        let normalized = normalize(raw, catalog);
        let skills = extract_skills(&normalized, catalog);
        Self { normalized, skills }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn catalog() -> SkillCatalog {
        SkillCatalog::builtin()
    }

    fn set(items: &[&str]) -> SkillSet {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_lowercases_and_blanks_punctuation() {
        assert_eq!(normalize("Rust, Go & C!", &catalog()), "rust  go   c ");
    }

    #[test]
    fn test_normalize_preserves_token_boundaries() {
        let out = normalize("Python/React", &catalog());
        assert_eq!(out, "python react");
    }

    #[test]
    fn test_normalize_rewrites_aliases_to_canonical() {
        assert_eq!(normalize("Postgres", &catalog()), "postgresql");
        assert_eq!(normalize("ML", &catalog()), "machine learning");
    }

    #[test]
    fn test_node_js_alias_is_captured_by_js_rule_first() {
        // "js" runs before "nodejs", so "nodejs" becomes "nodejavascript".
        assert_eq!(normalize("NodeJS", &catalog()), "nodejavascript");
        assert_eq!(normalize("ReactJS", &catalog()), "reactjavascript");
    }

    #[test]
    fn test_alias_rewrite_is_not_word_bounded() {
        assert_eq!(
            normalize("email", &catalog()),
            "emartificial intelligencel"
        );
    }

    #[test]
    fn test_normalize_empty_is_empty() {
        assert_eq!(normalize("", &catalog()), "");
    }

    #[test]
    fn test_non_ascii_letters_become_spaces() {
        assert_eq!(normalize("café", &catalog()), "caf ");
    }

    #[test]
    fn test_extract_skills_substring_semantics() {
        let skills = extract_skills("senior javascript engineer", &catalog());
        // "java" is contained in "javascript"
        assert_eq!(skills, set(&["java", "javascript"]));
    }

    #[test]
    fn test_extract_skills_never_matches_cpp_after_normalization() {
        let text = normalize("C++ and SQL", &catalog());
        assert_eq!(extract_skills(&text, &catalog()), set(&["sql"]));
    }

    #[test]
    fn test_extract_skills_multi_word_skill() {
        let text = normalize("Experience with ML and NLP", &catalog());
        assert_eq!(
            extract_skills(&text, &catalog()),
            set(&["machine learning", "nlp"])
        );
    }

    #[test]
    fn test_document_derive_end_to_end_example() {
        let resume = Document::derive("3 years experience with Python and React", &catalog());
        let jd = Document::derive(
            "backend developer with Python, React, AWS, 5+ years",
            &catalog(),
        );
        assert_eq!(resume.skills, set(&["python", "react"]));
        assert_eq!(jd.skills, set(&["aws", "python", "react"]));
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent_on_alias_free_output(text in "\\PC{0,64}") {
            let c = catalog();
            let once = normalize(&text, &c);
            prop_assume!(c.aliases.iter().all(|(alias, _)| !once.contains(alias)));
            prop_assert_eq!(normalize(&once, &c), once);
        }

        #[test]
        fn prop_normalized_text_is_lowercase_alnum_or_space(text in "\\PC{0,64}") {
            let once = normalize(&text, &catalog());
            prop_assert!(once
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace()));
        }
    }
}
