//! LRU + TTL 缓存
//!
//! 容量满时淘汰最久未访问的条目；读取时惰性剔除过期条目，也可调用 purge_expired 主动清理。
//! 命中 / 未命中 / 写入 / 淘汰次数计入统计。

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub evictions: u64,
    pub size: usize,
    /// 命中率百分比（0-100）
    pub hit_rate: u32,
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    accessed_at: Instant,
    expires_at: Instant,
}

#[derive(Debug)]
struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    stats: CacheStats,
}

#[derive(Debug)]
pub struct TtlCache<K, V> {
    max_entries: usize,
    default_ttl: Duration,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            max_entries: max_entries.max(1),
            default_ttl,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                stats: CacheStats::default(),
            }),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.lock();
        let now = Instant::now();
        let expired = inner.entries.get(key).map(|e| now >= e.expires_at);
        match expired {
            Some(false) => {
                inner.stats.hits += 1;
                let entry = inner.entries.get_mut(key)?;
                entry.accessed_at = now;
                Some(entry.value.clone())
            }
            Some(true) => {
                inner.entries.remove(key);
                inner.stats.misses += 1;
                None
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let mut inner = self.lock();
        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_entries {
            Self::evict_lru(&mut inner);
        }
        let now = Instant::now();
        inner.entries.insert(
            key,
            Entry {
                value,
                accessed_at: now,
                expires_at: now + ttl,
            },
        );
        inner.stats.sets += 1;
    }

    /// 命中则返回缓存值；否则执行 factory，成功结果写入缓存，失败不缓存
    pub async fn get_or_try_insert_with<E, F, Fut>(&self, key: K, factory: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = factory().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// 清理全部过期条目，返回清理数量
    pub fn purge_expired(&self) -> usize {
        let mut inner = self.lock();
        let now = Instant::now();
        let before = inner.entries.len();
        inner.entries.retain(|_, e| now < e.expires_at);
        before - inner.entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let lookups = inner.stats.hits + inner.stats.misses;
        let hit_rate = if lookups == 0 {
            0
        } else {
            ((inner.stats.hits as f64 / lookups as f64) * 100.0).round() as u32
        };
        CacheStats {
            size: inner.entries.len(),
            hit_rate,
            ..inner.stats.clone()
        }
    }

    fn evict_lru(inner: &mut Inner<K, V>) {
        let oldest = inner
            .entries
            .iter()
            .min_by_key(|(_, e)| e.accessed_at)
            .map(|(k, _)| k.clone());
        if let Some(key) = oldest {
            inner.entries.remove(&key);
            inner.stats.evictions += 1;
            tracing::debug!(size = inner.entries.len(), "cache evicted least recently used entry");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<K, V>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
