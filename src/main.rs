mod api;
mod cache;
mod catalog;
mod compat;
mod config;
mod errors;
mod knowledge;
mod matcher;
mod mcp_api;
mod models;
mod sequencer;
mod setup;
mod tools;
mod version;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use cache::{CacheBackend, CacheCoordinator, MemoryCache, RedisCache};
use catalog::CatalogClient;
use config::{CacheBackendKind, Config};
use knowledge::KnowledgeBase;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub catalog: CacheCoordinator,
    pub knowledge: Arc<KnowledgeBase>,
}

fn build_cache_backend(config: &Config) -> Option<Arc<dyn CacheBackend>> {
    match (config.cache_backend, config.redis_url.as_deref()) {
        (CacheBackendKind::Redis, Some(url)) => {
            match RedisCache::new(url, config.redis_pool_max) {
                Ok(cache) => Some(Arc::new(cache)),
                Err(err) => {
                    warn!("Redis cache unavailable, continuing without cache: {err}");
                    None
                }
            }
        }
        (CacheBackendKind::Memory, _) => {
            Some(Arc::new(MemoryCache::with_capacity(config.memory_cache_capacity)))
        }
        _ => None,
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::info))
        .route("/health", get(api::healthz))
        .route("/mcp", post(mcp_api::mcp).options(api::preflight))
        .route("/sse", get(api::sse))
        .fallback(api::not_found)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nyko_mcp=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env();
    let client = CatalogClient::new(&config.catalog_base_url, config.catalog_timeout)
        .context("failed to build catalog HTTP client")?;
    let backend = build_cache_backend(&config);
    info!(
        catalog = %config.catalog_base_url,
        cache = ?config.cache_backend,
        cached = backend.is_some(),
        setup_tool = config.enable_setup_tool,
        "nyko-mcp configured"
    );

    let state = AppState {
        config: config.clone(),
        catalog: CacheCoordinator::new(Arc::new(client), backend, config.cache_ttl),
        knowledge: Arc::new(KnowledgeBase::builtin()),
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("nyko-mcp listening on {}", config.bind_addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
