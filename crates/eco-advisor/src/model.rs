use serde::{Deserialize, Serialize};

use eco_engine::{Confidence, ExtractedFacts, SustainabilityResult};

/// Full evaluation for one product, as cached and returned to the extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductEvaluation {
    pub product_name: String,
    pub locale: String,
    pub category: String,
    pub category_name: String,
    pub confidence: Option<Confidence>,
    pub fallback_used: bool,
    pub result: SustainabilityResult,
    pub facts: ExtractedFacts,
    #[serde(default)]
    pub malformed_criteria: Vec<String>,
}

/// Category picked for aggregation, after the fallback policy has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCategory {
    pub id: String,
    pub confidence: Option<Confidence>,
    pub fallback_used: bool,
}
