use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, SourceWeights};
use crate::error::{EngineError, UnresolvedReason};
use crate::exclusion::{apply_exclusions, ScoredCategory};
use crate::scorer::{score_categories, SourceKind, SourceSignal};
use crate::winner::{rank, select_winner, ClassificationResult};

/// Raw product text as scraped by the browser extension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductSignals {
    pub product_name: String,
    #[serde(default)]
    pub page_title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ProductSignals {
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            ..Self::default()
        }
    }

    pub fn with_page_title(mut self, title: impl Into<String>) -> Self {
        self.page_title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Weighted sources for the scorer. Absent fields become empty, zero-contribution sources.
    pub fn sources(&self, weights: &SourceWeights) -> Vec<SourceSignal> {
        vec![
            SourceSignal::new(
                SourceKind::ProductName,
                self.product_name.clone(),
                weights.product_name,
            ),
            SourceSignal::new(
                SourceKind::PageTitle,
                self.page_title.clone().unwrap_or_default(),
                weights.page_title,
            ),
            SourceSignal::new(
                SourceKind::Description,
                self.description.clone().unwrap_or_default(),
                weights.description,
            ),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verdict {
    Resolved(ClassificationResult),
    Unresolved { reason: UnresolvedReason },
}

/// Verdict plus the ranked per-category scores that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub verdict: Verdict,
    pub scores: Vec<ScoredCategory>,
}

impl Classification {
    /// The winning category, only when confidence is high enough to act on.
    pub fn confident_category(&self) -> Option<&str> {
        match &self.verdict {
            Verdict::Resolved(result) if result.is_confident() => Some(&result.category),
            _ => None,
        }
    }
}

/// Run normalizer, scorer, exclusion filter and winner selector over one product.
///
/// An unresolved outcome is a normal `Verdict`, not an error; only catalog
/// inconsistencies surface as `Err`.
pub fn classify(
    signals: &ProductSignals,
    catalog: &Catalog,
) -> Result<Classification, EngineError> {
    let scoring = catalog.scoring();
    let sources = signals.sources(&scoring.source_weights);

    let raw = score_categories(&sources, catalog);
    let mut scores = apply_exclusions(raw, &signals.product_name, catalog)?;

    let verdict = match select_winner(&scores, &scoring.validation_thresholds) {
        Ok(result) => Verdict::Resolved(result),
        Err(EngineError::UnresolvedCategory { reason }) => Verdict::Unresolved { reason },
        Err(other) => return Err(other),
    };

    rank(&mut scores);
    Ok(Classification { verdict, scores })
}
