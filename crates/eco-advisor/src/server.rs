/// MCP server for product sustainability evaluation.
///
/// Exposes four tools:
/// - `classify_product`: Keyword-based category classification with per-category scores
/// - `evaluate_product`: Full evaluation (classification, web context, fact extraction, weighted score)
/// - `list_categories`: Catalog categories with their criteria weights
/// - `clear_cache`: Drop cached evaluations
use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tracing::info;

use eco_common::mcp_api::{
    CategoryInfo, CategoryListResponse, CategoryScoreInfo, ClassifyProductParams,
    ClassifyProductResponse, ClearCacheResponse, CriterionInfo, CriterionResult,
    EvaluateProductParams, EvaluateProductResponse, MatchedTermInfo,
};
use eco_engine::{CategoryDefinition, Classification, ProductSignals, ScoredCategory, Verdict};

use crate::model::ProductEvaluation;
use crate::service::{EvaluationService, DEFAULT_LOCALE};

#[derive(Clone)]
pub struct EcoAdvisorServer {
    service: Arc<EvaluationService>,
    tool_router: ToolRouter<EcoAdvisorServer>,
}

impl EcoAdvisorServer {
    pub fn new(service: Arc<EvaluationService>) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl EcoAdvisorServer {
    #[tool(description = "Classify a product into a sustainability category from its name, page title and description. Returns the winner with confidence, or the reason it is unresolved, plus every category's score.")]
    async fn classify_product(
        &self,
        Parameters(params): Parameters<ClassifyProductParams>,
    ) -> Result<Json<ClassifyProductResponse>, String> {
        let signals = to_signals(params.product_name, params.page_title, params.description);
        let classification = self
            .service
            .classify(&signals)
            .map_err(|e| format!("classification failed: {e}"))?;
        Ok(Json(to_api_classification(&classification)))
    }

    #[tool(description = "Evaluate a product's sustainability: classify it, gather web context, extract per-criterion facts and combine them with the category's weights into a 0-100 score and tier.")]
    async fn evaluate_product(
        &self,
        Parameters(params): Parameters<EvaluateProductParams>,
    ) -> Result<Json<EvaluateProductResponse>, String> {
        let locale = params.locale.unwrap_or_else(|| DEFAULT_LOCALE.to_string());
        let signals = to_signals(params.product_name, params.page_title, params.description);
        let (evaluation, cached) = self
            .service
            .evaluate(&signals, &locale)
            .await
            .map_err(|e| format!("evaluation failed: {e}"))?;
        Ok(Json(to_api_evaluation(&evaluation, cached)))
    }

    #[tool(description = "List the product categories known to the classifier with their keywords and sustainability criteria weights.")]
    async fn list_categories(&self) -> Result<Json<CategoryListResponse>, String> {
        let categories = self
            .service
            .catalog()
            .categories()
            .map(to_api_category)
            .collect();
        Ok(Json(CategoryListResponse { categories }))
    }

    #[tool(description = "Clear all cached product evaluations.")]
    async fn clear_cache(&self) -> Result<Json<ClearCacheResponse>, String> {
        info!("clear_cache tool invoked");
        let deleted = self.service.clear_cache().await;
        Ok(Json(ClearCacheResponse {
            cleared: deleted.is_some(),
            deleted_keys: deleted.unwrap_or(0),
        }))
    }
}

fn to_signals(
    product_name: String,
    page_title: Option<String>,
    description: Option<String>,
) -> ProductSignals {
    ProductSignals {
        product_name,
        page_title: page_title.filter(|s| !s.trim().is_empty()),
        description: description.filter(|s| !s.trim().is_empty()),
    }
}

fn to_api_classification(classification: &Classification) -> ClassifyProductResponse {
    let scores = classification.scores.iter().map(to_api_score).collect();
    match &classification.verdict {
        Verdict::Resolved(result) => ClassifyProductResponse {
            status: "resolved".to_string(),
            category: Some(result.category.clone()),
            confidence: Some(result.confidence.as_str().to_string()),
            ratio: result.ratio,
            reason: None,
            scores,
        },
        Verdict::Unresolved { reason } => ClassifyProductResponse {
            status: "unresolved".to_string(),
            category: None,
            confidence: None,
            ratio: None,
            reason: Some(reason.to_string()),
            scores,
        },
    }
}

fn to_api_score(scored: &ScoredCategory) -> CategoryScoreInfo {
    CategoryScoreInfo {
        category: scored.category().to_string(),
        raw_score: scored.score.raw_score,
        adjusted_score: scored.adjusted_score,
        exclusions_found: scored.exclusions_found.clone(),
        matched_terms: scored
            .score
            .matched_terms
            .iter()
            .map(|m| MatchedTermInfo {
                term: m.term.clone(),
                source: m.source.as_str().to_string(),
                count: m.count,
                points: m.points,
            })
            .collect(),
    }
}

fn to_api_evaluation(evaluation: &ProductEvaluation, cached: bool) -> EvaluateProductResponse {
    let criteria = evaluation
        .result
        .breakdown
        .iter()
        .map(|(criterion, breakdown)| CriterionResult {
            criterion: criterion.clone(),
            score: breakdown.score,
            weight: breakdown.weight,
            weighted: breakdown.weighted,
            evidence: evaluation
                .facts
                .criteria
                .get(criterion)
                .map(|c| c.evidence.clone())
                .unwrap_or_default(),
        })
        .collect();

    EvaluateProductResponse {
        product_name: evaluation.product_name.clone(),
        locale: evaluation.locale.clone(),
        category: evaluation.category.clone(),
        category_name: evaluation.category_name.clone(),
        confidence: evaluation.confidence.map(|c| c.as_str().to_string()),
        fallback_used: evaluation.fallback_used,
        final_score: evaluation.result.final_score,
        classification: evaluation.result.classification.as_str().to_string(),
        criteria,
        certifications: evaluation.facts.certifications.clone(),
        origin: evaluation.facts.origin.clone(),
        malformed_criteria: evaluation.malformed_criteria.clone(),
        cached,
    }
}

fn to_api_category(category: &CategoryDefinition) -> CategoryInfo {
    CategoryInfo {
        id: category.id.clone(),
        name: category.name.clone(),
        keywords: category.keywords.clone(),
        criteria: category
            .sustainability_criteria
            .iter()
            .map(|(name, config)| CriterionInfo {
                name: name.clone(),
                weight: config.weight,
                indicators: config.indicators.iter().map(|i| i.name.clone()).collect(),
            })
            .collect(),
    }
}

#[tool_handler]
impl ServerHandler for EcoAdvisorServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: "eco-advisor".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Product sustainability advisor. Use classify_product to see which category \
                 a product falls into and why, evaluate_product for a weighted 0-100 \
                 sustainability score with per-criterion evidence, list_categories to browse \
                 the catalog, and clear_cache after catalog or model changes."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use eco_engine::Catalog;

    use super::*;

    fn classification(name: &str) -> Classification {
        let catalog = Catalog::from_json_str(include_str!("../../../data/catalog.json"))
            .expect("bundled catalog");
        eco_engine::classify(&ProductSignals::new(name), &catalog).expect("classifies")
    }

    #[test]
    fn tools_publish_output_schemas() {
        let tools = EcoAdvisorServer::tool_router().list_all();
        for name in [
            "classify_product",
            "evaluate_product",
            "list_categories",
            "clear_cache",
        ] {
            let tool = tools
                .iter()
                .find(|t| t.name == name)
                .unwrap_or_else(|| panic!("missing tool: {name}"));
            assert!(
                tool.output_schema.is_some(),
                "tool {name} should publish output_schema"
            );
        }
    }

    #[test]
    fn test_resolved_classification_maps_scores() {
        let response = to_api_classification(&classification("Organic Cotton T-Shirt"));
        assert_eq!(response.status, "resolved");
        assert_eq!(response.category.as_deref(), Some("textiles_clothing"));
        assert_eq!(response.confidence.as_deref(), Some("medium"));
        assert!(response.reason.is_none());
        assert_eq!(response.scores[0].category, "textiles_clothing");
        assert!(response.scores[0]
            .matched_terms
            .iter()
            .all(|m| m.source == "product_name"));
    }

    #[test]
    fn test_unresolved_classification_has_reason() {
        let response = to_api_classification(&classification("Mystery gift box"));
        assert_eq!(response.status, "unresolved");
        assert!(response.category.is_none());
        assert!(response.reason.is_some());
        assert!(!response.scores.is_empty());
    }

    #[test]
    fn test_blank_optional_signals_are_dropped() {
        let signals = to_signals("Chair".to_string(), Some("  ".to_string()), None);
        assert!(signals.page_title.is_none());
        assert!(signals.description.is_none());
    }
}
