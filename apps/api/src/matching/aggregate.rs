use serde::{Deserialize, Serialize};

/// Fixed convex weights for the four component scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub skill_match: f64,
    pub semantic_similarity: f64,
    pub role_alignment: f64,
    pub experience: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            skill_match: 0.40,
            semantic_similarity: 0.30,
            role_alignment: 0.20,
            experience: 0.10,
        }
    }
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.skill_match + self.semantic_similarity + self.role_alignment + self.experience
    }

    /// Weighted sum of the components. Not clamped: a negative semantic
    /// similarity lowers the result below zero.
    pub fn aggregate(&self, skill: f64, semantic: f64, role: f64, experience: f64) -> f64 {
        self.skill_match * skill
            + self.semantic_similarity * semantic
            + self.role_alignment * role
            + self.experience * experience
    }
}

/// Final-score thresholds for the alignment band message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendationBands {
    pub strong: f64,
    pub partial: f64,
}

impl Default for RecommendationBands {
    fn default() -> Self {
        Self {
            strong: 0.75,
            partial: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentBand {
    Strong,
    Partial,
    Limited,
}

impl AlignmentBand {
    pub fn message(self) -> &'static str {
        match self {
            AlignmentBand::Strong => {
                "Your profile shows strong alignment with the role across skills, intent, and role expectations."
            }
            AlignmentBand::Partial => {
                "Your profile shows partial alignment with the role. Strengthening missing skills or clarifying experience could improve the match."
            }
            AlignmentBand::Limited => {
                "Your profile currently shows limited alignment with the role requirements. Consider reviewing required skills and role focus."
            }
        }
    }
}

impl RecommendationBands {
    pub fn classify(&self, final_score: f64) -> AlignmentBand {
        if final_score >= self.strong {
            AlignmentBand::Strong
        } else if final_score >= self.partial {
            AlignmentBand::Partial
        } else {
            AlignmentBand::Limited
        }
    }
}

/// Builds the ordered recommendation list: an optional missing-skills message
/// followed by exactly one band message.
pub fn recommend(
    missing_skills: &[String],
    final_score: f64,
    bands: &RecommendationBands,
) -> Vec<String> {
    let mut recommendations = Vec::with_capacity(2);

    if !missing_skills.is_empty() {
        recommendations.push(format!(
            "Consider adding or highlighting these skills: {}.",
            missing_skills.join(", ")
        ));
    }

    recommendations.push(bands.classify(final_score).message().to_string());
    recommendations
}
