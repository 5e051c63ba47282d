use async_trait::async_trait;

use eco_common::web_search::{SearchHit, WebSearchClient};

use crate::error::AppError;

/// Capability to fetch web context about a product before fact extraction.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, AppError>;
}

#[async_trait]
impl SearchProvider for WebSearchClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, AppError> {
        Ok(WebSearchClient::search(self, query).await?)
    }
}

/// Used when no search API is configured; extraction then relies on the product name.
pub struct NoSearch;

#[async_trait]
impl SearchProvider for NoSearch {
    async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, AppError> {
        Ok(Vec::new())
    }
}

pub fn search_query(product_name: &str, category_name: &str) -> String {
    format!("{product_name} {category_name} sustainability materials certifications repairability")
}

/// Render hits as numbered plain-text context for the extraction prompt.
pub fn format_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "[{}] {}\n{}\n{}",
                i + 1,
                hit.title.trim(),
                hit.url.trim(),
                hit.snippet.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
