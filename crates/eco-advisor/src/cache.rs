//! Redis caching layer for product evaluations.
//!
//! All operations degrade gracefully when Redis is absent.
//!
//! Key schema:
//! - `eco:v1:eval:{sha256(normalized product name|locale)}`: JSON `ProductEvaluation` (TTL, 24h default)

use sha2::{Digest, Sha256};
use tracing::debug;

use eco_common::redis::RedisCache;
use eco_engine::{normalize, NormalizationConfig};

use crate::model::ProductEvaluation;

const KEY_PREFIX: &str = "eco:v1:";

pub struct EvaluationCache {
    redis: RedisCache,
    ttl_secs: u64,
}

impl EvaluationCache {
    pub fn new(redis: RedisCache, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }

    pub async fn get_evaluation(
        &self,
        product_name: &str,
        locale: &str,
    ) -> Option<ProductEvaluation> {
        let key = evaluation_key(product_name, locale);
        let cached = self.redis.get_json(&key).await;
        if cached.is_some() {
            debug!(key, "evaluation cache hit");
        }
        cached
    }

    pub async fn set_evaluation(&self, evaluation: &ProductEvaluation) -> bool {
        let key = evaluation_key(&evaluation.product_name, &evaluation.locale);
        self.redis
            .set_json_with_ttl(&key, evaluation, self.ttl_secs)
            .await
    }

    /// Drop every cached evaluation. Returns the number of deleted keys.
    pub async fn invalidate_all(&self) -> Option<usize> {
        self.redis.delete_by_prefix(KEY_PREFIX).await
    }
}

/// Cache key from the normalized product name and the locale, so cosmetic differences in
/// the scraped name ("Black Heels" vs "black heels!") share an entry.
pub fn evaluation_key(product_name: &str, locale: &str) -> String {
    let name = normalize(product_name, &NormalizationConfig::default());
    let locale = locale.trim().to_ascii_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(b"|");
    hasher.update(locale.as_bytes());
    let hash = hasher.finalize();
    format!("{KEY_PREFIX}eval:{:x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ignores_cosmetic_differences() {
        assert_eq!(
            evaluation_key("Giuseppe Zanotti  Slim 2.0 Black", "en-US"),
            evaluation_key("giuseppe zanotti slim 2 0 black!", " EN-us ")
        );
    }

    #[test]
    fn test_key_depends_on_locale() {
        assert_ne!(
            evaluation_key("Organic cotton tee", "en"),
            evaluation_key("Organic cotton tee", "pt-BR")
        );
        assert!(evaluation_key("x", "en").starts_with("eco:v1:eval:"));
    }

    #[tokio::test]
    async fn test_disabled_cache_misses() {
        let cache = EvaluationCache::new(RedisCache::new(None), 60);
        assert!(cache.get_evaluation("anything", "en").await.is_none());
        assert_eq!(cache.invalidate_all().await, None);
    }
}
