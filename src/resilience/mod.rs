//! 容错组件：熔断器、LRU + TTL 缓存、优先级任务队列

pub mod cache;
pub mod circuit_breaker;
pub mod job_queue;

pub use cache::{CacheStats, TtlCache};
pub use circuit_breaker::{BreakerError, BreakerSnapshot, BreakerState, CircuitBreaker};
pub use job_queue::{JobId, JobQueue, QueueMetrics, QueuedJob};
