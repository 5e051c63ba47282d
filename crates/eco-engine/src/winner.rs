use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::ValidationThresholds;
use crate::error::{EngineError, UnresolvedReason};
use crate::exclusion::ScoredCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Winning category for a product.
///
/// `Low` confidence must be treated like an unresolved outcome by anything that depends on
/// the category being right, such as picking per-category criterion weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: String,
    pub confidence: Confidence,
    pub score: f64,
    /// Ratio of the winner's score to the runner-up's. `None` when the runner-up scored 0.
    pub ratio: Option<f64>,
}

impl ClassificationResult {
    pub fn is_confident(&self) -> bool {
        self.confidence == Confidence::Medium
    }
}

/// Order by adjusted score descending, breaking ties by category id.
pub fn rank(scores: &mut [ScoredCategory]) {
    scores.sort_by(compare);
}

/// Pick the winning category, enforcing the minimum score, the exclusion veto and the
/// confidence ratio gate.
pub fn select_winner(
    scores: &[ScoredCategory],
    thresholds: &ValidationThresholds,
) -> Result<ClassificationResult, EngineError> {
    let mut ranked: Vec<&ScoredCategory> = scores.iter().collect();
    ranked.sort_by(|a, b| compare(a, b));

    let Some(first) = ranked.first() else {
        return Err(EngineError::unresolved(UnresolvedReason::NoCategories));
    };

    if first.adjusted_score < thresholds.minimum_score {
        return Err(EngineError::unresolved(
            UnresolvedReason::InsufficientEvidence {
                best: first.category().to_string(),
                score: first.adjusted_score,
                minimum: thresholds.minimum_score,
            },
        ));
    }

    if first.is_excluded() {
        return Err(EngineError::unresolved(UnresolvedReason::ExclusionVeto {
            category: first.category().to_string(),
            terms: first.exclusions_found.clone(),
        }));
    }

    let second_score = ranked.get(1).map_or(0.0, |s| s.adjusted_score);
    let ratio = (second_score > 0.0).then(|| first.adjusted_score / second_score);
    let confidence = match ratio {
        Some(r) if r < thresholds.confidence_ratio => Confidence::Low,
        _ => Confidence::Medium,
    };

    debug!(
        category = %first.category(),
        score = first.adjusted_score,
        runner_up = second_score,
        ?confidence,
        "winner selected"
    );

    Ok(ClassificationResult {
        category: first.category().to_string(),
        confidence,
        score: first.adjusted_score,
        ratio,
    })
}

fn compare(a: &ScoredCategory, b: &ScoredCategory) -> Ordering {
    b.adjusted_score
        .total_cmp(&a.adjusted_score)
        .then_with(|| a.category().cmp(b.category()))
}
