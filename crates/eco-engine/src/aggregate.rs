use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::EngineError;

/// Per-criterion evidence supplied by the fact extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionEvaluation {
    pub score: u8,
    #[serde(default)]
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionBreakdown {
    pub score: u8,
    pub weight: f64,
    pub weighted: f64,
}

pub type ScoreBreakdown = BTreeMap<String, CriterionBreakdown>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SustainabilityTier {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

impl SustainabilityTier {
    pub fn from_score(score: u8) -> Self {
        match score {
            85.. => Self::Excellent,
            70..=84 => Self::Good,
            50..=69 => Self::Acceptable,
            _ => Self::Poor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Acceptable => "acceptable",
            Self::Poor => "poor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SustainabilityResult {
    pub final_score: u8,
    pub breakdown: ScoreBreakdown,
    pub classification: SustainabilityTier,
}

/// Combine extracted criterion scores with the category's configured weights.
///
/// Only criteria configured for the category participate; a configured criterion absent
/// from `facts` contributes a score of 0. The result is normalized by the accumulated
/// weight, so weights need not sum to 1.
pub fn aggregate(
    facts: &BTreeMap<String, CriterionEvaluation>,
    category: &str,
    catalog: &Catalog,
) -> Result<SustainabilityResult, EngineError> {
    let definition = catalog.category(category)?;

    let mut breakdown = ScoreBreakdown::new();
    let mut total_weighted = 0.0;
    let mut total_weight = 0.0;

    for (criterion, config) in &definition.sustainability_criteria {
        let score = facts
            .get(criterion)
            .map_or(0, |evaluation| evaluation.score.min(100));
        let weighted = f64::from(score) * config.weight;
        total_weighted += weighted;
        total_weight += config.weight;
        breakdown.insert(
            criterion.clone(),
            CriterionBreakdown {
                score,
                weight: config.weight,
                weighted,
            },
        );
    }

    let final_score = if total_weight > 0.0 {
        round_mean(total_weighted / total_weight)
    } else {
        0
    };

    Ok(SustainabilityResult {
        final_score,
        breakdown,
        classification: SustainabilityTier::from_score(final_score),
    })
}

/// Snap float noise from weight scaling before rounding, so an exact `.5` mean always
/// rounds up.
fn round_mean(mean: f64) -> u8 {
    let snapped = (mean * MEAN_SNAP).round() / MEAN_SNAP;
    snapped.round().clamp(0.0, 100.0) as u8
}

const MEAN_SNAP: f64 = 1e9;
