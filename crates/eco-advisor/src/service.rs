//! Evaluation flow: classify, resolve the category, gather context, extract facts, score.

use std::sync::Arc;

use tracing::{debug, info, warn};

use eco_engine::{
    aggregate, classify, parse_facts, Catalog, Classification, EngineError, ProductSignals,
    Verdict,
};

use crate::cache::EvaluationCache;
use crate::error::AppError;
use crate::extractor::{ExtractionRequest, FactExtractor};
use crate::model::{ProductEvaluation, ResolvedCategory};
use crate::search::{format_context, search_query, SearchProvider};

pub const DEFAULT_LOCALE: &str = "en";

pub struct EvaluationService {
    catalog: Arc<Catalog>,
    extractor: Arc<dyn FactExtractor>,
    search: Arc<dyn SearchProvider>,
    cache: Arc<EvaluationCache>,
    fallback_category: String,
}

impl EvaluationService {
    /// Fails when `fallback_category` is not part of the catalog.
    pub fn new(
        catalog: Arc<Catalog>,
        extractor: Arc<dyn FactExtractor>,
        search: Arc<dyn SearchProvider>,
        cache: Arc<EvaluationCache>,
        fallback_category: String,
    ) -> Result<Self, AppError> {
        if !catalog.contains(&fallback_category) {
            return Err(AppError::Config(format!(
                "fallback category '{fallback_category}' is not defined in the catalog"
            )));
        }
        Ok(Self {
            catalog,
            extractor,
            search,
            cache,
            fallback_category,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn classify(&self, signals: &ProductSignals) -> Result<Classification, AppError> {
        validate(signals)?;
        let classification = classify(signals, &self.catalog)?;
        match &classification.verdict {
            Verdict::Resolved(result) => info!(
                product = %signals.product_name,
                category = %result.category,
                confidence = ?result.confidence,
                score = result.score,
                "product classified"
            ),
            Verdict::Unresolved { reason } => info!(
                product = %signals.product_name,
                %reason,
                "product classification unresolved"
            ),
        }
        Ok(classification)
    }

    /// Low confidence and unresolved outcomes both use the fallback category.
    pub fn resolve_category(
        &self,
        classification: &Classification,
    ) -> Result<ResolvedCategory, AppError> {
        if let Verdict::Resolved(result) = &classification.verdict {
            if result.is_confident() {
                return Ok(ResolvedCategory {
                    id: result.category.clone(),
                    confidence: Some(result.confidence),
                    fallback_used: false,
                });
            }
        }

        if !self.catalog.contains(&self.fallback_category) {
            return Err(EngineError::CategoryNotFound(self.fallback_category.clone()).into());
        }
        debug!(fallback = %self.fallback_category, "using fallback category");
        Ok(ResolvedCategory {
            id: self.fallback_category.clone(),
            confidence: None,
            fallback_used: true,
        })
    }

    /// Evaluate one product. The flag is true when the evaluation came from the cache.
    pub async fn evaluate(
        &self,
        signals: &ProductSignals,
        locale: &str,
    ) -> Result<(ProductEvaluation, bool), AppError> {
        validate(signals)?;
        let locale = match locale.trim() {
            "" => DEFAULT_LOCALE,
            trimmed => trimmed,
        };

        if let Some(cached) = self.cache.get_evaluation(&signals.product_name, locale).await {
            info!(product = %signals.product_name, locale, "evaluation served from cache");
            return Ok((cached, true));
        }

        let classification = self.classify(signals)?;
        let resolved = self.resolve_category(&classification)?;
        let category = self.catalog.category(&resolved.id)?;

        let query = search_query(&signals.product_name, &category.name);
        let hits = self
            .search
            .search(&query)
            .await
            .inspect_err(|e| warn!(error = %e, "web search failed, extracting without context"))
            .unwrap_or_default();
        debug!(hits = hits.len(), "search context gathered");
        let context = format_context(&hits);

        let payload = self
            .extractor
            .extract(&ExtractionRequest {
                product_name: &signals.product_name,
                category,
                search_context: &context,
                locale,
            })
            .await
            .inspect_err(|e| {
                warn!(error = %e, product = %signals.product_name, "fact extraction failed")
            })?;

        let (facts, problems) = parse_facts(&payload);
        let malformed_criteria: Vec<String> = problems
            .into_iter()
            .filter_map(|problem| match problem {
                EngineError::MalformedFacts { criterion, .. } => Some(criterion),
                _ => None,
            })
            .collect();

        let result = aggregate(&facts.criteria, &resolved.id, &self.catalog)?;
        info!(
            product = %signals.product_name,
            category = %resolved.id,
            final_score = result.final_score,
            tier = result.classification.as_str(),
            fallback = resolved.fallback_used,
            "product evaluated"
        );

        let evaluation = ProductEvaluation {
            product_name: signals.product_name.clone(),
            locale: locale.to_string(),
            category: resolved.id,
            category_name: category.name.clone(),
            confidence: resolved.confidence,
            fallback_used: resolved.fallback_used,
            result,
            facts,
            malformed_criteria,
        };

        if !self.cache.set_evaluation(&evaluation).await {
            debug!("evaluation not cached");
        }
        Ok((evaluation, false))
    }

    pub async fn clear_cache(&self) -> Option<usize> {
        let deleted = self.cache.invalidate_all().await;
        info!(deleted = ?deleted, "evaluation cache cleared");
        deleted
    }
}

fn validate(signals: &ProductSignals) -> Result<(), AppError> {
    if signals.product_name.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "product_name must not be empty".to_string(),
        ));
    }
    Ok(())
}
