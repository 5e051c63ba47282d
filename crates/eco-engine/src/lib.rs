//! Deterministic product category classification and sustainability scoring.
//!
//! Everything in this crate is synchronous and side-effect free: text signals and
//! extracted facts come in, category verdicts and scores come out. LLM calls, web
//! search and caching live with the callers.

pub mod aggregate;
pub mod catalog;
pub mod error;
pub mod exclusion;
pub mod expand;
pub mod facts;
pub mod normalize;
pub mod pipeline;
pub mod scorer;
pub mod winner;

pub use aggregate::{
    aggregate, CriterionBreakdown, CriterionEvaluation, ScoreBreakdown, SustainabilityResult,
    SustainabilityTier,
};
pub use catalog::{
    Catalog, CategoryDefinition, CriterionWeightConfig, Indicator, IndicatorRubric,
    MatchingConfig, RubricBand, ScoringConfig, SourceWeights, ValidationThresholds,
};
pub use error::{EngineError, UnresolvedReason};
pub use exclusion::{apply_exclusions, ScoredCategory};
pub use expand::expand_keyword;
pub use facts::{parse_facts, ExtractedFacts};
pub use normalize::{normalize, NormalizationConfig};
pub use pipeline::{classify, Classification, ProductSignals, Verdict};
pub use scorer::{score_categories, CategoryScore, MatchedTerm, SourceKind, SourceSignal};
pub use winner::{select_winner, ClassificationResult, Confidence};
