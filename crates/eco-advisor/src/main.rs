mod cache;
mod config;
mod error;
mod extractor;
mod model;
mod rate_limit;
mod search;
mod server;
mod service;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cache::EvaluationCache;
use config::Config;
use eco_common::openai::{OpenAiClient, OpenAiClientConfig};
use eco_common::redis::RedisCache;
use eco_common::web_search::{WebSearchClient, WebSearchConfig};
use eco_engine::Catalog;
use extractor::LlmFactExtractor;
use rate_limit::RateLimiter;
use search::{NoSearch, SearchProvider};
use server::EcoAdvisorServer;
use service::EvaluationService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting eco-advisor MCP server");

    let config = Config::from_env()?;
    info!(
        catalog_path = %config.catalog_path.display(),
        redis = config.redis_url.is_some(),
        extraction_model = %config.extraction_model,
        fallback_category = %config.fallback_category,
        "configuration loaded"
    );

    let catalog = Arc::new(Catalog::load(&config.catalog_path)?);
    info!(categories = catalog.categories().count(), "catalog loaded");

    let redis_cache = RedisCache::new(config.redis_url.as_deref());
    if !redis_cache.is_enabled() {
        info!("REDIS_URL not set, running without cache");
    } else if redis_cache.is_available().await {
        info!("redis connected");
    } else {
        warn!("redis unreachable, evaluations are not cached until it recovers");
    }
    let cache = Arc::new(EvaluationCache::new(redis_cache, config.cache_ttl_secs));

    let openai = Arc::new(OpenAiClient::new(OpenAiClientConfig::from_env())?);
    let limiter = RateLimiter::from_env();
    if limiter.is_some() {
        info!("extraction rate limiting enabled");
    }
    let extractor = Arc::new(LlmFactExtractor::new(
        openai,
        config.extraction_model.clone(),
        limiter,
    ));

    let search: Arc<dyn SearchProvider> = match WebSearchConfig::from_env() {
        Some(search_config) => {
            info!(endpoint = %search_config.endpoint, "web search enabled");
            Arc::new(WebSearchClient::new(search_config)?)
        }
        None => {
            info!("SEARCH_API_URL not set, extracting without web context");
            Arc::new(NoSearch)
        }
    };

    let service = Arc::new(EvaluationService::new(
        catalog,
        extractor,
        search,
        cache,
        config.fallback_category.clone(),
    )?);
    let server = EcoAdvisorServer::new(service);

    if let Ok(addr) = std::env::var("MCP_TCP_LISTEN_ADDR") {
        let listener = TcpListener::bind(&addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.clone();
            tokio::spawn(async move {
                tracing::info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                tracing::info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    } else {
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            tracing::error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        info!("MCP server shut down");
    }
    Ok(())
}
