//! Text canonicalization applied to every product signal and keyword before matching.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s]").expect("valid regex"));
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Toggles for the individual normalization steps. All steps are on by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    pub lowercase: bool,
    pub strip_accents: bool,
    pub strip_punctuation: bool,
    pub collapse_whitespace: bool,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            strip_accents: true,
            strip_punctuation: true,
            collapse_whitespace: true,
        }
    }
}

/// Canonicalize `text` for keyword matching.
///
/// Steps run in a fixed order: lowercase, accent stripping (NFD followed by removal of
/// combining marks), replacement of anything outside `[a-z0-9\s]` with a space, and
/// whitespace collapsing with trimming.
pub fn normalize(text: &str, config: &NormalizationConfig) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut out = if config.lowercase {
        text.to_lowercase()
    } else {
        text.to_string()
    };

    if config.strip_accents {
        out = out.nfd().filter(|c| !is_combining_mark(*c)).collect();
    }

    if config.strip_punctuation {
        out = NON_ALPHANUMERIC.replace_all(&out, " ").into_owned();
    }

    if config.collapse_whitespace {
        out = WHITESPACE_RUN.replace_all(&out, " ").trim().to_string();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(text: &str) -> String {
        normalize(text, &NormalizationConfig::default())
    }

    #[test]
    fn test_full_pipeline() {
        assert_eq!(
            norm("  Giuseppe Zanotti Slim 2.0 Black Heels - Amazon.com "),
            "giuseppe zanotti slim 2 0 black heels amazon com"
        );
    }

    #[test]
    fn test_strips_accents() {
        assert_eq!(norm("Pão de Açúcar Café"), "pao de acucar cafe");
        assert_eq!(norm("Crème brûlée"), "creme brulee");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(norm(""), "");
        assert_eq!(norm("   \t\n "), "");
        assert_eq!(norm("!!!---"), "");
    }

    #[test]
    fn test_is_idempotent() {
        let samples = [
            "Giuseppe Zanotti Slim 2.0 Black",
            "Camiseta Orgânica — 100% algodão",
            "ÅNGSTRÖM   ＡＢＣ  ñandú",
            "tab\tseparated\nlines",
            "İstanbul ßtraße",
            "",
            "  ",
            "emoji 🚗 car",
        ];
        for sample in samples {
            let once = norm(sample);
            assert_eq!(norm(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_steps_can_be_disabled() {
        let config = NormalizationConfig {
            lowercase: false,
            strip_accents: false,
            strip_punctuation: false,
            collapse_whitespace: true,
        };
        assert_eq!(normalize("  Café,   Latte ", &config), "Café, Latte");

        let config = NormalizationConfig {
            collapse_whitespace: false,
            ..NormalizationConfig::default()
        };
        assert_eq!(normalize("a-b", &config), "a b");
        assert_eq!(normalize(" a  b ", &config), " a  b ");
    }
}
