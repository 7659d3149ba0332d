//! JSON 抓取
//!
//! HttpFetcher：reqwest 客户端，单次请求超时由配置决定；成功响应按 URL 写入 LRU + TTL 缓存。

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::clients::{audit, ClientError};
use crate::config::CollectionSection;
use crate::resilience::TtlCache;

const USER_AGENT: &str = concat!("agentflow/", env!("CARGO_PKG_VERSION"));

/// 带超时的 JSON GET
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<Value, ClientError>;
}

pub struct HttpFetcher {
    client: Client,
    cache: Arc<TtlCache<String, Value>>,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64, cache: Arc<TtlCache<String, Value>>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self { client, cache }
    }

    pub fn from_config(cfg: &CollectionSection) -> Self {
        let cache = Arc::new(TtlCache::new(
            cfg.cache_max_entries,
            Duration::from_secs(cfg.cache_ttl_secs),
        ));
        Self::new(cfg.timeout_secs, cache)
    }

    pub fn cache(&self) -> &Arc<TtlCache<String, Value>> {
        &self.cache
    }

    async fn fetch(&self, url: &str) -> Result<Value, ClientError> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::Status(resp.status().as_u16()));
        }
        Ok(resp.json::<Value>().await?)
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    async fn get_json(&self, url: &str) -> Result<Value, ClientError> {
        let started = Instant::now();
        let result = self
            .cache
            .get_or_try_insert_with(url.to_string(), || self.fetch(url))
            .await;
        audit("fetch", url, result.is_ok(), started);
        result
    }
}
