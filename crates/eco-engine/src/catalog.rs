//! Static category taxonomy and global scoring thresholds.
//!
//! The catalog is parsed and validated once at startup, then shared read-only
//! (typically behind an `Arc`) by every classification and aggregation request.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::normalize::NormalizationConfig;

/// One band of an indicator rubric, e.g. "excellent: >= 80% recycled content".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricBand {
    pub threshold: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRubric {
    pub excellent: RubricBand,
    pub good: RubricBand,
    pub acceptable: RubricBand,
    pub poor: RubricBand,
}

/// Evidence hint handed to the fact extractor. Never evaluated by the engine itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<IndicatorRubric>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionWeightConfig {
    pub weight: f64,
    #[serde(default)]
    pub indicators: Vec<Indicator>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    /// Filled from the catalog key on load.
    #[serde(default, skip_serializing)]
    pub id: String,
    pub name: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub keyword_synonyms: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub exclusion_keywords: Vec<String>,
    #[serde(default)]
    pub sustainability_criteria: BTreeMap<String, CriterionWeightConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceWeights {
    pub product_name: f64,
    pub page_title: f64,
    pub description: f64,
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self {
            product_name: 3.0,
            page_title: 2.0,
            description: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationThresholds {
    pub minimum_score: f64,
    pub confidence_ratio: f64,
    pub exclusion_penalty: f64,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            minimum_score: 2.0,
            confidence_ratio: 1.5,
            exclusion_penalty: -1000.0,
        }
    }
}

/// Keyword matching mode. Word-boundary matching keeps "car" from matching "card".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub word_boundary: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            word_boundary: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub source_weights: SourceWeights,
    #[serde(default)]
    pub validation_thresholds: ValidationThresholds,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub normalization: NormalizationConfig,
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    scoring: ScoringConfig,
    categories: BTreeMap<String, CategoryDefinition>,
}

/// Immutable category catalog. Iteration is ordered by category id.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    scoring: ScoringConfig,
    categories: BTreeMap<String, CategoryDefinition>,
}

impl Catalog {
    /// Build a catalog from parts, assigning ids from the map keys and validating weights.
    pub fn new(
        scoring: ScoringConfig,
        categories: BTreeMap<String, CategoryDefinition>,
    ) -> Result<Self, EngineError> {
        let categories = categories
            .into_iter()
            .map(|(id, mut category)| {
                category.id = id.clone();
                (id, category)
            })
            .collect();

        let catalog = Self {
            scoring,
            categories,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let document: CatalogDocument = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidCatalog(format!("failed to parse catalog: {e}")))?;
        Self::new(document.scoring, document.categories)
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            EngineError::InvalidCatalog(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    /// Look up a category, failing hard rather than substituting defaults.
    pub fn category(&self, id: &str) -> Result<&CategoryDefinition, EngineError> {
        self.categories
            .get(id)
            .ok_or_else(|| EngineError::CategoryNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.categories.contains_key(id)
    }

    pub fn categories(&self) -> impl Iterator<Item = &CategoryDefinition> {
        self.categories.values()
    }

    fn validate(&self) -> Result<(), EngineError> {
        let weights = &self.scoring.source_weights;
        for (name, weight) in [
            ("product_name", weights.product_name),
            ("page_title", weights.page_title),
            ("description", weights.description),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(EngineError::InvalidCatalog(format!(
                    "source weight '{name}' must be a finite non-negative number, got {weight}"
                )));
            }
        }

        let thresholds = &self.scoring.validation_thresholds;
        if !thresholds.minimum_score.is_finite() || thresholds.minimum_score <= 0.0 {
            return Err(EngineError::InvalidCatalog(format!(
                "minimum_score must be > 0, got {}",
                thresholds.minimum_score
            )));
        }
        if !thresholds.confidence_ratio.is_finite() || thresholds.confidence_ratio < 1.0 {
            return Err(EngineError::InvalidCatalog(format!(
                "confidence_ratio must be >= 1, got {}",
                thresholds.confidence_ratio
            )));
        }
        if !thresholds.exclusion_penalty.is_finite() || thresholds.exclusion_penalty > 0.0 {
            return Err(EngineError::InvalidCatalog(format!(
                "exclusion_penalty must be <= 0, got {}",
                thresholds.exclusion_penalty
            )));
        }

        for category in self.categories.values() {
            if category.id.trim().is_empty() {
                return Err(EngineError::InvalidCatalog(
                    "category id must not be empty".to_string(),
                ));
            }
            for (criterion, config) in &category.sustainability_criteria {
                if !config.weight.is_finite() || !(0.0..=1.0).contains(&config.weight) {
                    return Err(EngineError::InvalidCatalog(format!(
                        "criterion '{criterion}' in category '{}' has weight {} outside [0, 1]",
                        category.id, config.weight
                    )));
                }
            }
        }

        Ok(())
    }
}
