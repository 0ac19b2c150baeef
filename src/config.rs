use std::{env, net::SocketAddr, time::Duration};

use tracing::warn;

use crate::{cache::DEFAULT_TTL, catalog::DEFAULT_BASE_URL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    Redis,
    Memory,
    None,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub catalog_base_url: String,
    pub catalog_timeout: Duration,
    pub cache_backend: CacheBackendKind,
    pub redis_url: Option<String>,
    pub redis_pool_max: usize,
    pub cache_ttl: Duration,
    pub memory_cache_capacity: usize,
    pub enable_setup_tool: bool,
    pub mcp_dev_log_payloads: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().trim_matches('"').trim_matches('\'').to_string())
                .filter(|v| !v.is_empty())
        };
        let flag = |key: &str| {
            var(key)
                .map(|v| {
                    matches!(
                        v.to_ascii_lowercase().as_str(),
                        "1" | "true" | "yes" | "on"
                    )
                })
                .unwrap_or(false)
        };

        let bind_addr = var("NYKO_BIND_ADDR")
            .and_then(|v| v.parse::<SocketAddr>().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8787)));

        let catalog_base_url =
            var("NYKO_CATALOG_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let catalog_timeout = Duration::from_secs(
            var("NYKO_CATALOG_TIMEOUT_SECONDS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(10),
        );

        let redis_url = var("NYKO_REDIS_URL").or_else(|| var("REDIS_URL"));

        let requested = var("NYKO_CACHE_BACKEND").map(|v| v.to_ascii_lowercase());
        let cache_backend = match (requested.as_deref(), redis_url.is_some()) {
            (Some("memory"), _) => CacheBackendKind::Memory,
            (Some("none"), _) => CacheBackendKind::None,
            (Some("redis"), false) => {
                warn!("NYKO_CACHE_BACKEND=redis but no Redis URL is set; caching disabled");
                CacheBackendKind::None
            }
            (None | Some("redis"), true) => CacheBackendKind::Redis,
            (None, false) => CacheBackendKind::None,
            (Some(other), _) => {
                warn!("Unknown NYKO_CACHE_BACKEND {other:?}; caching disabled");
                CacheBackendKind::None
            }
        };

        let redis_pool_max = var("NYKO_REDIS_POOL_MAX")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(8);

        let cache_ttl = var("NYKO_CACHE_TTL_SECONDS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TTL);

        let memory_cache_capacity = var("NYKO_MEMORY_CACHE_CAPACITY")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(256);

        Self {
            bind_addr,
            catalog_base_url,
            catalog_timeout,
            cache_backend,
            redis_url,
            redis_pool_max,
            cache_ttl,
            memory_cache_capacity,
            enable_setup_tool: flag("NYKO_ENABLE_SETUP_TOOL"),
            mcp_dev_log_payloads: flag("NYKO_MCP_DEV_LOG_PAYLOADS"),
        }
    }
}
