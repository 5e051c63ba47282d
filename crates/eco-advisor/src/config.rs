use std::path::PathBuf;

use crate::error::AppError;

const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Application configuration loaded explicitly from environment variables.
///
/// OpenAI and web search clients read their own variables (`OPENAI_*`, `SEARCH_*`).
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the category catalog JSON document.
    pub catalog_path: PathBuf,
    /// Redis connection URL. `None` disables the evaluation cache.
    pub redis_url: Option<String>,
    pub cache_ttl_secs: u64,
    /// Chat model used for fact extraction.
    pub extraction_model: String,
    /// Category used when classification is unresolved or low confidence.
    pub fallback_category: String,
}

impl Config {
    /// Required:
    /// - `ECO_CATALOG_PATH`
    ///
    /// Optional:
    /// - `REDIS_URL`
    /// - `ECO_CACHE_TTL_SECS` (default: 86400)
    /// - `ECO_EXTRACTION_MODEL` (default: "gpt-4o-mini")
    /// - `ECO_FALLBACK_CATEGORY` (default: "other")
    pub fn from_env() -> Result<Self, AppError> {
        let catalog_path = std::env::var("ECO_CATALOG_PATH").map_err(|_| {
            AppError::Config("ECO_CATALOG_PATH environment variable is required".to_string())
        })?;
        let catalog_path = PathBuf::from(catalog_path);
        if !catalog_path.exists() {
            return Err(AppError::Config(format!(
                "catalog not found at {}",
                catalog_path.display()
            )));
        }

        let cache_ttl_secs = match std::env::var("ECO_CACHE_TTL_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                AppError::Config(format!(
                    "ECO_CACHE_TTL_SECS must be a number of seconds, got '{raw}'"
                ))
            })?,
            Err(_) => DEFAULT_CACHE_TTL_SECS,
        };

        let extraction_model = std::env::var("ECO_EXTRACTION_MODEL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "gpt-4o-mini".to_string());

        let fallback_category = std::env::var("ECO_FALLBACK_CATEGORY")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "other".to_string());

        Ok(Self {
            catalog_path,
            redis_url: std::env::var("REDIS_URL").ok(),
            cache_ttl_secs,
            extraction_model,
            fallback_category,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use super::*;

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "ECO_CATALOG_PATH",
            "ECO_CACHE_TTL_SECS",
            "ECO_EXTRACTION_MODEL",
            "ECO_FALLBACK_CATEGORY",
            "REDIS_URL",
        ] {
            std::env::remove_var(key);
        }
    }

    fn bundled_catalog() -> String {
        format!("{}/../../data/catalog.json", env!("CARGO_MANIFEST_DIR"))
    }

    #[test]
    fn test_catalog_path_is_required() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let err = Config::from_env().expect_err("missing catalog path");
        assert!(err.to_string().contains("ECO_CATALOG_PATH"));
    }

    #[test]
    fn test_defaults() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        std::env::set_var("ECO_CATALOG_PATH", bundled_catalog());
        let config = Config::from_env().expect("config loads");
        assert_eq!(config.cache_ttl_secs, 86_400);
        assert_eq!(config.extraction_model, "gpt-4o-mini");
        assert_eq!(config.fallback_category, "other");
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn test_rejects_bad_ttl_and_missing_file() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        std::env::set_var("ECO_CATALOG_PATH", bundled_catalog());
        std::env::set_var("ECO_CACHE_TTL_SECS", "a day");
        assert!(Config::from_env().is_err());

        reset_env();
        std::env::set_var("ECO_CATALOG_PATH", "/nonexistent/catalog.json");
        assert!(Config::from_env().is_err());
    }
}
