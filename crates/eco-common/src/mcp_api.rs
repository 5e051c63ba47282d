use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ClassifyProductParams {
    /// Product name as shown on the shop page.
    pub product_name: String,
    /// Browser tab / page title, if available.
    pub page_title: Option<String>,
    /// Product description text, if available.
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct EvaluateProductParams {
    /// Product name as shown on the shop page.
    pub product_name: String,
    /// Browser tab / page title, if available.
    pub page_title: Option<String>,
    /// Product description text, if available.
    pub description: Option<String>,
    /// User locale such as "en-US" or "pt-BR" (default: "en").
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MatchedTermInfo {
    pub term: String,
    pub source: String,
    pub count: usize,
    pub points: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CategoryScoreInfo {
    pub category: String,
    pub raw_score: f64,
    pub adjusted_score: f64,
    pub exclusions_found: Vec<String>,
    pub matched_terms: Vec<MatchedTermInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClassifyProductResponse {
    /// "resolved" or "unresolved".
    pub status: String,
    pub category: Option<String>,
    /// "medium" or "low". Low confidence should be treated as unresolved.
    pub confidence: Option<String>,
    /// Winner-to-runner-up score ratio; absent when the runner-up scored 0.
    pub ratio: Option<f64>,
    /// Populated for unresolved outcomes.
    pub reason: Option<String>,
    /// Every category, ranked by adjusted score.
    pub scores: Vec<CategoryScoreInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CriterionResult {
    pub criterion: String,
    pub score: u8,
    pub weight: f64,
    pub weighted: f64,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EvaluateProductResponse {
    pub product_name: String,
    pub locale: String,
    pub category: String,
    pub category_name: String,
    /// Confidence of the classifier; absent when the fallback category was used.
    pub confidence: Option<String>,
    /// True when classification was unresolved or low confidence and the fallback applied.
    pub fallback_used: bool,
    pub final_score: u8,
    /// "excellent", "good", "acceptable" or "poor".
    pub classification: String,
    pub criteria: Vec<CriterionResult>,
    pub certifications: Vec<String>,
    pub origin: Option<String>,
    /// Criteria the extractor returned in an unusable shape (scored as 0).
    pub malformed_criteria: Vec<String>,
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CriterionInfo {
    pub name: String,
    pub weight: f64,
    pub indicators: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CategoryInfo {
    pub id: String,
    pub name: String,
    pub keywords: Vec<String>,
    pub criteria: Vec<CriterionInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CategoryListResponse {
    pub categories: Vec<CategoryInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClearCacheResponse {
    /// False when the cache is disabled or Redis was unreachable.
    pub cleared: bool,
    pub deleted_keys: usize,
}
