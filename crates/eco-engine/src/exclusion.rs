use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::Catalog;
use crate::error::EngineError;
use crate::normalize::normalize;
use crate::scorer::{count_occurrences, matchable_variants, CategoryScore};

/// A category score after the exclusion filter has run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCategory {
    #[serde(flatten)]
    pub score: CategoryScore,
    pub exclusions_found: Vec<String>,
    pub adjusted_score: f64,
}

impl ScoredCategory {
    pub fn category(&self) -> &str {
        &self.score.category
    }

    pub fn is_excluded(&self) -> bool {
        !self.exclusions_found.is_empty()
    }
}

/// Penalize categories whose exclusion keywords appear in the primary signal.
///
/// The penalty is applied once per category no matter how many exclusion terms match.
/// A score for a category missing from the catalog is a `CategoryNotFound` error.
pub fn apply_exclusions(
    scores: Vec<CategoryScore>,
    primary_text: &str,
    catalog: &Catalog,
) -> Result<Vec<ScoredCategory>, EngineError> {
    let scoring = catalog.scoring();
    let primary = normalize(primary_text, &scoring.normalization);
    let penalty = scoring.validation_thresholds.exclusion_penalty;

    scores
        .into_iter()
        .map(|score| {
            let category = catalog.category(&score.category)?;

            let mut exclusions_found = Vec::new();
            if !primary.is_empty() {
                for keyword in &category.exclusion_keywords {
                    let hit = matchable_variants(keyword, category, &scoring.normalization)
                        .iter()
                        .any(|variant| {
                            count_occurrences(&primary, variant, scoring.matching.word_boundary) > 0
                        });
                    if hit && !exclusions_found.contains(keyword) {
                        exclusions_found.push(keyword.clone());
                    }
                }
            }

            let adjusted_score = if exclusions_found.is_empty() {
                score.raw_score
            } else {
                debug!(
                    category = %category.id,
                    terms = ?exclusions_found,
                    "exclusion terms matched"
                );
                score.raw_score + penalty
            };

            Ok(ScoredCategory {
                score,
                exclusions_found,
                adjusted_score,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::catalog::{CategoryDefinition, ScoringConfig};

    fn catalog() -> Catalog {
        let mut categories = BTreeMap::new();
        categories.insert(
            "automotive".to_string(),
            CategoryDefinition {
                id: String::new(),
                name: "Automotive".to_string(),
                keywords: vec!["car".to_string()],
                keyword_synonyms: BTreeMap::new(),
                exclusion_keywords: vec!["toy".to_string(), "charger".to_string()],
                sustainability_criteria: BTreeMap::new(),
            },
        );
        categories.insert(
            "electronics".to_string(),
            CategoryDefinition {
                id: String::new(),
                name: "Electronics".to_string(),
                keywords: vec!["charger".to_string()],
                keyword_synonyms: BTreeMap::new(),
                exclusion_keywords: Vec::new(),
                sustainability_criteria: BTreeMap::new(),
            },
        );
        Catalog::new(ScoringConfig::default(), categories).expect("valid catalog")
    }

    fn raw(category: &str, score: f64) -> CategoryScore {
        CategoryScore {
            category: category.to_string(),
            raw_score: score,
            matched_terms: Vec::new(),
        }
    }

    #[test]
    fn test_penalty_applied_once() {
        let catalog = catalog();
        let filtered = apply_exclusions(
            vec![raw("automotive", 40.0), raw("electronics", 3.0)],
            "Toy Car Charger (toys)",
            &catalog,
        )
        .expect("categories exist");

        let automotive = &filtered[0];
        assert_eq!(automotive.exclusions_found, vec!["toy", "charger"]);
        assert_eq!(automotive.adjusted_score, 40.0 - 1000.0);
        assert!(automotive.is_excluded());

        let electronics = &filtered[1];
        assert!(!electronics.is_excluded());
        assert_eq!(electronics.adjusted_score, 3.0);
    }

    #[test]
    fn test_plural_exclusion_matches() {
        let catalog = catalog();
        let filtered =
            apply_exclusions(vec![raw("automotive", 5.0)], "RC cars for kids toys", &catalog)
                .expect("category exists");
        assert_eq!(filtered[0].exclusions_found, vec!["toy"]);
    }

    #[test]
    fn test_empty_primary_text_matches_nothing() {
        let catalog = catalog();
        let filtered =
            apply_exclusions(vec![raw("automotive", 5.0)], "", &catalog).expect("category exists");
        assert!(!filtered[0].is_excluded());
        assert_eq!(filtered[0].adjusted_score, 5.0);
    }

    #[test]
    fn test_unknown_category_fails() {
        let catalog = catalog();
        let err = apply_exclusions(vec![raw("furniture", 1.0)], "sofa", &catalog)
            .expect_err("unknown category");
        assert_eq!(err, EngineError::CategoryNotFound("furniture".to_string()));
    }
}
