//! Match pipeline — normalizes a résumé/JD pair, runs the four scorers,
//! aggregates, and attaches recommendations.
//!
//! Everything except the embedding call is pure. The embedder is injected at
//! construction; the pipeline never owns model state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::embeddings::{Embedder, EmbeddingError};
use crate::matching::aggregate::{recommend, RecommendationBands, ScoringWeights};
use crate::matching::catalog::SkillCatalog;
use crate::matching::normalize::Document;
use crate::matching::scorers::{
    experience_score, role_alignment_score, semantic_similarity_score, skill_match_score,
};

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("{field} must not be empty")]
    EmptyInput { field: &'static str },

    #[error("Semantic similarity failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Scoring weights must sum to 1.0, got {total}")]
    InvalidWeights { total: f64 },
}

/// Component scores plus the weighted final score derived from them.
/// Construct only through `ScoreBreakdown::new`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    skill_match: f64,
    semantic_similarity: f64,
    role_alignment: f64,
    experience: f64,
    final_score: f64,
}

impl ScoreBreakdown {
    pub fn new(
        skill_match: f64,
        semantic_similarity: f64,
        role_alignment: f64,
        experience: f64,
        weights: &ScoringWeights,
    ) -> Self {
        Self {
            skill_match,
            semantic_similarity,
            role_alignment,
            experience,
            final_score: weights.aggregate(
                skill_match,
                semantic_similarity,
                role_alignment,
                experience,
            ),
        }
    }

    pub fn skill_match(&self) -> f64 {
        self.skill_match
    }

    pub fn semantic_similarity(&self) -> f64 {
        self.semantic_similarity
    }

    pub fn role_alignment(&self) -> f64 {
        self.role_alignment
    }

    pub fn experience(&self) -> f64 {
        self.experience
    }

    pub fn final_score(&self) -> f64 {
        self.final_score
    }
}

#[derive(Debug, Clone)]
pub struct MatchResult {
    pub scores: ScoreBreakdown,
    /// Sorted JD skills also found in the résumé.
    pub matched_skills: Vec<String>,
    /// Sorted JD skills absent from the résumé.
    pub missing_skills: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Result bundle returned to HTTP callers. Scores are percentages rounded to
/// two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub final_score: f64,
    pub skill_match_score: f64,
    pub semantic_similarity: f64,
    pub role_alignment_score: f64,
    pub experience_score: f64,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub recommendations: Vec<String>,
}

impl From<&MatchResult> for MatchReport {
    fn from(result: &MatchResult) -> Self {
        let s = &result.scores;
        Self {
            final_score: as_percent(s.final_score()),
            skill_match_score: as_percent(s.skill_match()),
            semantic_similarity: as_percent(s.semantic_similarity()),
            role_alignment_score: as_percent(s.role_alignment()),
            experience_score: as_percent(s.experience()),
            matched_skills: result.matched_skills.clone(),
            missing_skills: result.missing_skills.clone(),
            recommendations: result.recommendations.clone(),
        }
    }
}

/// Scales a [0, 1] score to a percentage rounded to two decimals.
pub fn as_percent(score: f64) -> f64 {
    round2(score * 100.0)
}

/// Rounds to two decimals through decimal formatting, which rounds the exact
/// binary value (4702.955 is stored just below the half and becomes 4702.95).
pub fn round2(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}

const WEIGHT_TOLERANCE: f64 = 1e-9;

pub struct MatchPipeline {
    catalog: SkillCatalog,
    weights: ScoringWeights,
    bands: RecommendationBands,
    embedder: Arc<dyn Embedder>,
}

impl MatchPipeline {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            catalog: SkillCatalog::builtin(),
            weights: ScoringWeights::default(),
            bands: RecommendationBands::default(),
            embedder,
        }
    }

    /// Replaces the default weights. Weights must sum to 1.0 so the final
    /// score remains a convex combination of the components.
    pub fn with_weights(mut self, weights: ScoringWeights) -> Result<Self, MatchError> {
        let total = weights.total();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(MatchError::InvalidWeights { total });
        }
        self.weights = weights;
        Ok(self)
    }

    /// Scores a résumé against a job description.
    ///
    /// Empty (or whitespace-only) inputs are rejected before any scoring.
    /// An embedding failure fails the whole match.
    pub async fn analyze(&self, resume_text: &str, jd_text: &str) -> Result<MatchResult, MatchError> {
        if resume_text.trim().is_empty() {
            return Err(MatchError::EmptyInput {
                field: "resume_text",
            });
        }
        if jd_text.trim().is_empty() {
            return Err(MatchError::EmptyInput {
                field: "job_description",
            });
        }

        let resume = Document::derive(resume_text, &self.catalog);
        let jd = Document::derive(jd_text, &self.catalog);

        let skill = skill_match_score(&resume.skills, &jd.skills);
        let role = role_alignment_score(&resume.normalized, &jd.normalized, self.catalog.role_keywords);
        let experience = experience_score(&resume.normalized);
        let semantic =
            semantic_similarity_score(self.embedder.as_ref(), &resume.normalized, &jd.normalized)
                .await?;

        debug!(skill, semantic, role, experience, "Component scores computed");

        let scores = ScoreBreakdown::new(skill, semantic, role, experience, &self.weights);

        let matched_skills: Vec<String> = jd.skills.intersection(&resume.skills).cloned().collect();
        let missing_skills: Vec<String> = jd.skills.difference(&resume.skills).cloned().collect();
        let recommendations = recommend(&missing_skills, scores.final_score(), &self.bands);

        info!(
            final_score = scores.final_score(),
            matched = matched_skills.len(),
            missing = missing_skills.len(),
            "Match scored"
        );

        Ok(MatchResult {
            scores,
            matched_skills,
            missing_skills,
            recommendations,
        })
    }
}
