use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{Catalog, CategoryDefinition, MatchingConfig};
use crate::expand::expand_keyword;
use crate::normalize::{normalize, NormalizationConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    ProductName,
    PageTitle,
    Description,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductName => "product_name",
            Self::PageTitle => "page_title",
            Self::Description => "description",
        }
    }
}

/// A weighted piece of free text describing the product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSignal {
    pub source: SourceKind,
    pub text: String,
    pub weight: f64,
}

impl SourceSignal {
    pub fn new(source: SourceKind, text: impl Into<String>, weight: f64) -> Self {
        Self {
            source,
            text: text.into(),
            weight,
        }
    }
}

/// One non-zero contribution to a category score, kept for explainability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedTerm {
    pub term: String,
    pub source: SourceKind,
    pub count: usize,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: String,
    pub raw_score: f64,
    pub matched_terms: Vec<MatchedTerm>,
}

struct PreparedSource<'a> {
    signal: &'a SourceSignal,
    text: String,
}

/// Score every catalog category against the weighted sources.
///
/// Returns one entry per category in catalog order; categories without hits score 0.
pub fn score_categories(sources: &[SourceSignal], catalog: &Catalog) -> Vec<CategoryScore> {
    let scoring = catalog.scoring();

    let prepared: Vec<PreparedSource<'_>> = sources
        .iter()
        .filter(|signal| signal.weight.is_finite() && signal.weight > 0.0)
        .filter_map(|signal| {
            let text = normalize(&signal.text, &scoring.normalization);
            (!text.is_empty()).then_some(PreparedSource { signal, text })
        })
        .collect();

    catalog
        .categories()
        .map(|category| {
            score_category(
                category,
                &prepared,
                &scoring.normalization,
                &scoring.matching,
            )
        })
        .collect()
}

fn score_category(
    category: &CategoryDefinition,
    sources: &[PreparedSource<'_>],
    normalization: &NormalizationConfig,
    matching: &MatchingConfig,
) -> CategoryScore {
    let mut raw_score = 0.0;
    let mut matched_terms = Vec::new();

    for source in sources {
        for keyword in &category.keywords {
            for variant in matchable_variants(keyword, category, normalization) {
                let count = count_occurrences(&source.text, &variant, matching.word_boundary);
                if count == 0 {
                    continue;
                }
                let points = count as f64 * source.signal.weight;
                raw_score += points;
                matched_terms.push(MatchedTerm {
                    term: variant,
                    source: source.signal.source,
                    count,
                    points,
                });
            }
        }
    }

    if raw_score > 0.0 {
        debug!(
            category = %category.id,
            raw_score,
            matches = matched_terms.len(),
            "category scored"
        );
    }

    CategoryScore {
        category: category.id.clone(),
        raw_score,
        matched_terms,
    }
}

/// Expanded keyword variants passed through the same normalizer as the text, so that
/// configured forms like "t-shirt" line up with normalized text like "t shirt".
pub(crate) fn matchable_variants(
    keyword: &str,
    category: &CategoryDefinition,
    normalization: &NormalizationConfig,
) -> BTreeSet<String> {
    expand_keyword(keyword, &category.keyword_synonyms)
        .into_iter()
        .map(|variant| normalize(&variant, normalization))
        .filter(|variant| !variant.is_empty())
        .collect()
}

/// Count non-overlapping occurrences of `needle` in `haystack`.
///
/// With `word_boundary` set, a match only counts when the characters on either side are
/// non-alphanumeric or the string edge.
pub fn count_occurrences(haystack: &str, needle: &str, word_boundary: bool) -> usize {
    if needle.is_empty() {
        return 0;
    }

    let mut count = 0;
    let mut start = 0;
    while let Some(offset) = haystack[start..].find(needle) {
        let begin = start + offset;
        let end = begin + needle.len();
        let bounded = !word_boundary
            || (boundary_before(haystack, begin) && boundary_after(haystack, end));
        if bounded {
            count += 1;
            start = end;
        } else {
            start = begin + haystack[begin..].chars().next().map_or(1, char::len_utf8);
        }
    }
    count
}

fn boundary_before(haystack: &str, index: usize) -> bool {
    haystack[..index]
        .chars()
        .next_back()
        .map_or(true, |c| !c.is_alphanumeric())
}

fn boundary_after(haystack: &str, index: usize) -> bool {
    haystack[index..]
        .chars()
        .next()
        .map_or(true, |c| !c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::catalog::ScoringConfig;

    fn category(keywords: &[&str], synonyms: &[(&str, &[&str])]) -> CategoryDefinition {
        CategoryDefinition {
            id: String::new(),
            name: String::new(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            keyword_synonyms: synonyms
                .iter()
                .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
                .collect(),
            exclusion_keywords: Vec::new(),
            sustainability_criteria: BTreeMap::new(),
        }
    }

    fn catalog(scoring: ScoringConfig) -> Catalog {
        let mut categories = BTreeMap::new();
        categories.insert(
            "automotive".to_string(),
            category(&["car", "tire"], &[("car", &["automobile"])]),
        );
        categories.insert(
            "textiles_clothing".to_string(),
            category(&["t-shirt", "shoes"], &[("shoes", &["heels"])]),
        );
        categories.insert("electronics".to_string(), category(&["watch"], &[]));
        Catalog::new(scoring, categories).expect("valid catalog")
    }

    fn score_of<'a>(scores: &'a [CategoryScore], id: &str) -> &'a CategoryScore {
        scores
            .iter()
            .find(|s| s.category == id)
            .unwrap_or_else(|| panic!("missing score for {id}"))
    }

    #[test]
    fn test_count_respects_word_boundaries() {
        assert_eq!(count_occurrences("car card scar car", "car", true), 2);
        assert_eq!(count_occurrences("car card scar car", "car", false), 4);
        assert_eq!(count_occurrences("car", "car", true), 1);
        assert_eq!(count_occurrences("", "car", true), 0);
        assert_eq!(count_occurrences("car", "", true), 0);
        assert_eq!(count_occurrences("cafe car", "car", true), 1);
    }

    #[test]
    fn test_scores_every_category_with_weights() {
        let catalog = catalog(ScoringConfig::default());
        let sources = vec![
            SourceSignal::new(SourceKind::ProductName, "Organic Cotton T-Shirt", 3.0),
            SourceSignal::new(SourceKind::PageTitle, "T-Shirts and Heels | Shop", 2.0),
            SourceSignal::new(SourceKind::Description, "Not a car accessory", 0.0),
        ];
        let scores = score_categories(&sources, &catalog);
        assert_eq!(scores.len(), 3);

        let textiles = score_of(&scores, "textiles_clothing");
        // "t shirt" in name (3), "t shirts" + "heels" in title (2 + 2)
        assert_eq!(textiles.raw_score, 7.0);
        assert_eq!(textiles.matched_terms.len(), 3);
        assert!(textiles
            .matched_terms
            .iter()
            .any(|m| m.term == "heels" && m.source == SourceKind::PageTitle && m.points == 2.0));

        assert_eq!(score_of(&scores, "automotive").raw_score, 0.0);
        assert!(score_of(&scores, "electronics").matched_terms.is_empty());
    }

    #[test]
    fn test_substring_mode_counts_inside_words() {
        let scoring = ScoringConfig {
            matching: MatchingConfig {
                word_boundary: false,
            },
            ..ScoringConfig::default()
        };
        let catalog = catalog(scoring);
        let sources = vec![SourceSignal::new(SourceKind::ProductName, "gift card", 1.0)];
        let scores = score_categories(&sources, &catalog);
        assert_eq!(score_of(&scores, "automotive").raw_score, 1.0);

        let catalog = self::catalog(ScoringConfig::default());
        let scores = score_categories(&sources, &catalog);
        assert_eq!(score_of(&scores, "automotive").raw_score, 0.0);
    }

    #[test]
    fn test_is_referentially_transparent() {
        let catalog = catalog(ScoringConfig::default());
        let sources = vec![
            SourceSignal::new(SourceKind::ProductName, "Automobile car tire", 3.0),
            SourceSignal::new(SourceKind::Description, "smart watch for the car", 1.0),
        ];
        let first = score_categories(&sources, &catalog);
        for _ in 0..10 {
            assert_eq!(score_categories(&sources, &catalog), first);
        }
    }
}
