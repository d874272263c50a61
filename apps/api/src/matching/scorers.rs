//! The four component scorers. Three are pure functions over normalized text
//! and skill sets; semantic similarity is the only one that suspends.

use std::sync::LazyLock;

use regex::Regex;

use crate::embeddings::{cosine_similarity, Embedder, EmbeddingError};
use crate::matching::normalize::SkillSet;

/// Score given when no "<N> years" statement is present.
pub const DEFAULT_EXPERIENCE_SCORE: f64 = 0.2;
/// Stated years at which experience earns full credit.
pub const FULL_CREDIT_YEARS: f64 = 5.0;

static YEARS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]+)\+?\s*years").expect("years pattern is a valid regex")
});

/// `|resume ∩ jd| / |jd|`; 0.0 when the JD names no catalog skills.
pub fn skill_match_score(resume_skills: &SkillSet, jd_skills: &SkillSet) -> f64 {
    if jd_skills.is_empty() {
        return 0.0;
    }
    let matched = resume_skills.intersection(jd_skills).count();
    matched as f64 / jd_skills.len() as f64
}

/// Ratio of distinct role keywords present in the résumé to those in the JD,
/// capped at 1.0; 0.0 when the JD uses none.
pub fn role_alignment_score(resume_text: &str, jd_text: &str, role_keywords: &[&str]) -> f64 {
    let hits = |text: &str| role_keywords.iter().filter(|kw| text.contains(*kw)).count();

    let jd_hits = hits(jd_text);
    if jd_hits == 0 {
        return 0.0;
    }
    (hits(resume_text) as f64 / jd_hits as f64).min(1.0)
}

/// Largest stated "<N> years" figure over `FULL_CREDIT_YEARS`, capped at 1.0.
/// Only the plural form counts: "4 year degree" is not an experience claim.
pub fn experience_score(text: &str) -> f64 {
    let max_years = YEARS_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        // a digit run only fails to parse on overflow
        .map(|m| m.as_str().parse::<u64>().unwrap_or(u64::MAX))
        .max();

    match max_years {
        Some(years) => (years as f64 / FULL_CREDIT_YEARS).min(1.0),
        None => DEFAULT_EXPERIENCE_SCORE,
    }
}

/// Cosine similarity of the two texts' embeddings, in [-1, 1] and unclamped.
/// Collaborator failures propagate; no default similarity is substituted.
pub async fn semantic_similarity_score(
    embedder: &dyn Embedder,
    text1: &str,
    text2: &str,
) -> Result<f64, EmbeddingError> {
    let vectors = embedder.embed(&[text1, text2]).await?;
    match vectors.as_slice() {
        [a, b] => cosine_similarity(a, b),
        other => Err(EmbeddingError::Malformed(format!(
            "expected 2 embeddings, got {}",
            other.len()
        ))),
    }
}
