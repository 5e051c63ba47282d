use serde::{Deserialize, Serialize};

/// Failures produced by the classification and scoring engine.
///
/// Every variant is a deterministic function of the inputs, so callers should never
/// retry on them. Collaborator failures (LLM, search, cache) are modelled elsewhere.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("category could not be resolved: {reason}")]
    UnresolvedCategory { reason: UnresolvedReason },

    #[error("category not found in catalog: {0}")]
    CategoryNotFound(String),

    #[error("malformed facts for criterion '{criterion}': {message}")]
    MalformedFacts { criterion: String, message: String },

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
}

impl EngineError {
    pub fn unresolved(reason: UnresolvedReason) -> Self {
        Self::UnresolvedCategory { reason }
    }
}

/// Why the winner selector refused to name a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnresolvedReason {
    NoCategories,
    InsufficientEvidence {
        best: String,
        score: f64,
        minimum: f64,
    },
    ExclusionVeto {
        category: String,
        terms: Vec<String>,
    },
}

impl std::fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnresolvedReason::NoCategories => write!(f, "catalog has no categories"),
            UnresolvedReason::InsufficientEvidence {
                best,
                score,
                minimum,
            } => write!(
                f,
                "insufficient evidence (best '{best}' scored {score:.2}, minimum {minimum:.2})"
            ),
            UnresolvedReason::ExclusionVeto { category, terms } => write!(
                f,
                "top category '{category}' vetoed by exclusion terms: {}",
                terms.join(", ")
            ),
        }
    }
}
