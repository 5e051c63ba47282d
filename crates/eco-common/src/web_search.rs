use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CommonError;
use crate::openai::read_capped_body;

const MAX_ERROR_BODY_BYTES: usize = 1024;

#[derive(Clone, Debug)]
pub struct WebSearchConfig {
    pub endpoint: String,
    pub api_key: String,
    pub max_results: usize,
    pub timeout: Duration,
}

impl WebSearchConfig {
    /// Returns `None` unless both `SEARCH_API_URL` and `SEARCH_API_KEY` are set.
    ///
    /// Optional:
    /// - `SEARCH_MAX_RESULTS` (default: 5)
    /// - `SEARCH_TIMEOUT_SECS` (default: 10)
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("SEARCH_API_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())?;
        let api_key = std::env::var("SEARCH_API_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty())?;

        let max_results = std::env::var("SEARCH_MAX_RESULTS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(5);

        let timeout = std::env::var("SEARCH_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(10));

        Some(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            max_results,
            timeout,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default, alias = "content", alias = "description")]
    pub snippet: String,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// Client for a JSON web search API (`POST {endpoint}` with `{query, max_results}`,
/// answering `{results: [{title, url, snippet|content}]}`).
#[derive(Clone)]
pub struct WebSearchClient {
    config: WebSearchConfig,
    http: reqwest::Client,
}

impl WebSearchClient {
    pub fn new(config: WebSearchConfig) -> Result<Self, CommonError> {
        let http = reqwest::Client::builder()
            .user_agent("eco-advisor/web-search")
            .build()?;
        Ok(Self { config, http })
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, CommonError> {
        let resp = self
            .http
            .post(&self.config.endpoint)
            .timeout(self.config.timeout)
            .bearer_auth(&self.config.api_key)
            .json(&SearchRequest {
                query,
                max_results: self.config.max_results,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = read_capped_body(resp, MAX_ERROR_BODY_BYTES).await;
            return Err(CommonError::SearchUpstream { status, body });
        }

        let parsed: SearchResponse = resp.json().await?;
        let mut hits = parsed.results;
        hits.truncate(self.config.max_results);
        debug!(query, hits = hits.len(), "web search complete");
        Ok(hits)
    }
}
