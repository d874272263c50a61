//! Top-K ranking evaluation over an already-scored batch.
//!
//! Relevance is derived from the score itself (score ≥ threshold), so the
//! metrics measure how well the top-K cut agrees with the threshold cut.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matching::pipeline::round2;

#[derive(Debug, Error, PartialEq)]
pub enum EvaluationError {
    #[error("k must be at least 1")]
    ZeroK,

    #[error("score for '{id}' is not a finite number")]
    NonFiniteScore { id: String },
}

/// A scored candidate as produced by the match pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub id: String,
    pub final_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: String,
    pub final_score: f64,
    pub relevant: bool,
}

impl EvaluationRecord {
    pub fn label(&self) -> u8 {
        u8::from(self.relevant)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopKMetrics {
    pub k: usize,
    pub relevant_in_top_k: usize,
    pub total_relevant: usize,
    pub precision_at_k: f64,
    /// `None` when the batch has no relevant documents at all.
    pub recall_at_k: Option<f64>,
    pub f1_at_k: f64,
}

impl TopKMetrics {
    /// Same metrics rounded to two decimals for reporting.
    pub fn rounded(&self) -> Self {
        Self {
            precision_at_k: round2(self.precision_at_k),
            recall_at_k: self.recall_at_k.map(round2),
            f1_at_k: round2(self.f1_at_k),
            ..self.clone()
        }
    }
}

/// Sorts descending by score (stable: ties keep input order) and labels each
/// record relevant iff its score is at least `threshold`.
pub fn rank(
    batch: Vec<ScoredDocument>,
    threshold: f64,
) -> Result<Vec<EvaluationRecord>, EvaluationError> {
    if let Some(bad) = batch.iter().find(|d| !d.final_score.is_finite()) {
        return Err(EvaluationError::NonFiniteScore { id: bad.id.clone() });
    }

    let mut records: Vec<EvaluationRecord> = batch
        .into_iter()
        .map(|doc| EvaluationRecord {
            relevant: doc.final_score >= threshold,
            id: doc.id,
            final_score: doc.final_score,
        })
        .collect();

    records.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
    Ok(records)
}

/// Precision, recall and F1 at `k` over ranked records.
///
/// Precision always divides by `k`, even when fewer than `k` records exist.
/// Recall is undefined (`None`) when nothing in the batch is relevant; F1 then
/// counts it as zero.
pub fn metrics_at_k(records: &[EvaluationRecord], k: usize) -> Result<TopKMetrics, EvaluationError> {
    if k == 0 {
        return Err(EvaluationError::ZeroK);
    }

    let relevant_in_top_k = records.iter().take(k).filter(|r| r.relevant).count();
    let total_relevant = records.iter().filter(|r| r.relevant).count();

    let precision_at_k = relevant_in_top_k as f64 / k as f64;
    let recall_at_k =
        (total_relevant > 0).then(|| relevant_in_top_k as f64 / total_relevant as f64);

    let recall = recall_at_k.unwrap_or(0.0);
    let f1_at_k = if precision_at_k + recall > 0.0 {
        2.0 * precision_at_k * recall / (precision_at_k + recall)
    } else {
        0.0
    };

    Ok(TopKMetrics {
        k,
        relevant_in_top_k,
        total_relevant,
        precision_at_k,
        recall_at_k,
        f1_at_k,
    })
}

/// Ranks the batch and computes top-K metrics in one step.
pub fn evaluate_top_k(
    batch: Vec<ScoredDocument>,
    k: usize,
    threshold: f64,
) -> Result<(Vec<EvaluationRecord>, TopKMetrics), EvaluationError> {
    if k == 0 {
        return Err(EvaluationError::ZeroK);
    }
    let records = rank(batch, threshold)?;
    let metrics = metrics_at_k(&records, k)?;
    Ok((records, metrics))
}
