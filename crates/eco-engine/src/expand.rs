use std::collections::{BTreeMap, BTreeSet};

/// Expand a configured keyword into every surface form the scorer should look for.
///
/// The result holds the lowercased keyword, its configured synonyms, a naive plural
/// (`+s` unless it already ends in `s`) and a naive singular (trailing `s` removed).
/// Synonyms are looked up by the keyword as written, then by its lowercase form.
pub fn expand_keyword(
    keyword: &str,
    synonyms: &BTreeMap<String, Vec<String>>,
) -> BTreeSet<String> {
    let mut variants = BTreeSet::new();

    let base = keyword.trim().to_lowercase();
    if base.is_empty() {
        return variants;
    }

    let configured = synonyms
        .get(keyword)
        .or_else(|| synonyms.get(keyword.trim()))
        .or_else(|| synonyms.get(&base));
    if let Some(list) = configured {
        for synonym in list {
            let synonym = synonym.trim().to_lowercase();
            if !synonym.is_empty() {
                variants.insert(synonym);
            }
        }
    }

    match base.strip_suffix('s') {
        Some(singular) if !singular.is_empty() => {
            variants.insert(singular.to_string());
        }
        Some(_) => {}
        None => {
            variants.insert(format!("{base}s"));
        }
    }

    variants.insert(base);
    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_synonyms() -> BTreeMap<String, Vec<String>> {
        BTreeMap::new()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plural_and_singular() {
        assert_eq!(expand_keyword("Shoe", &no_synonyms()), set(&["shoe", "shoes"]));
        assert_eq!(expand_keyword("shoes", &no_synonyms()), set(&["shoe", "shoes"]));
        assert_eq!(expand_keyword("glass", &no_synonyms()), set(&["glas", "glass"]));
    }

    #[test]
    fn test_includes_synonyms() {
        let mut synonyms = BTreeMap::new();
        synonyms.insert(
            "shoes".to_string(),
            vec!["Heels".to_string(), "sneakers".to_string(), " ".to_string()],
        );
        assert_eq!(
            expand_keyword("shoes", &synonyms),
            set(&["heels", "shoe", "shoes", "sneakers"])
        );
    }

    #[test]
    fn test_synonyms_found_by_lowercase_key() {
        let mut synonyms = BTreeMap::new();
        synonyms.insert("laptop".to_string(), vec!["notebook".to_string()]);
        let variants = expand_keyword("Laptop", &synonyms);
        assert!(variants.contains("notebook"));
        assert!(variants.contains("laptops"));
    }

    #[test]
    fn test_never_yields_empty_strings() {
        assert!(expand_keyword("", &no_synonyms()).is_empty());
        assert!(expand_keyword("   ", &no_synonyms()).is_empty());
        let variants = expand_keyword("s", &no_synonyms());
        assert_eq!(variants, set(&["s"]));
        assert!(variants.iter().all(|v| !v.is_empty()));
    }
}
