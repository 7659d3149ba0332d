//! 熔断器
//!
//! Closed：正常放行，连续失败达到阈值后转 Open；
//! Open：直接拒绝，直到 reset_timeout 过去后转 HalfOpen；
//! HalfOpen：试探放行，连续成功 half_open_successes 次后恢复 Closed，任一失败立即重新 Open。

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::ResilienceSection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Error, Debug)]
pub enum BreakerError<E> {
    #[error("Circuit breaker '{0}' is open")]
    Open(String),
    #[error("{0}")]
    Inner(E),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BreakerMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub rejected_requests: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: BreakerState,
    pub failure_count: u32,
    pub metrics: BreakerMetrics,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
    metrics: BreakerMetrics,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    reset_timeout: Duration,
    half_open_successes: u32,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(
        name: impl Into<String>,
        failure_threshold: u32,
        reset_timeout: Duration,
        half_open_successes: u32,
    ) -> Self {
        Self {
            name: name.into(),
            failure_threshold: failure_threshold.max(1),
            reset_timeout,
            half_open_successes: half_open_successes.max(1),
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                failure_count: 0,
                success_count: 0,
                opened_at: None,
                metrics: BreakerMetrics::default(),
            }),
        }
    }

    pub fn from_config(name: impl Into<String>, cfg: &ResilienceSection) -> Self {
        Self::new(
            name,
            cfg.failure_threshold,
            Duration::from_secs(cfg.reset_timeout_secs),
            cfg.half_open_successes,
        )
    }

    /// 经熔断器执行一次异步操作；Open 状态下不调用 op 直接返回 BreakerError::Open
    pub async fn call<T, E, F, Fut>(&self, op: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.before_call::<E>()?;
        match op().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(e) => {
                self.on_failure();
                Err(BreakerError::Inner(e))
            }
        }
    }

    fn before_call<E>(&self) -> Result<(), BreakerError<E>> {
        let mut inner = self.lock();
        inner.metrics.total_requests += 1;
        if inner.state == BreakerState::Open {
            let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
            if elapsed >= self.reset_timeout {
                tracing::info!(breaker = %self.name, "circuit half-open, probing");
                inner.state = BreakerState::HalfOpen;
                inner.success_count = 0;
            } else {
                inner.metrics.rejected_requests += 1;
                return Err(BreakerError::Open(self.name.clone()));
            }
        }
        Ok(())
    }

    fn on_success(&self) {
        let mut inner = self.lock();
        inner.metrics.successful_requests += 1;
        match inner.state {
            BreakerState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.half_open_successes {
                    tracing::info!(breaker = %self.name, "circuit closed");
                    inner.state = BreakerState::Closed;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                    inner.opened_at = None;
                }
            }
            _ => inner.failure_count = 0,
        }
    }

    fn on_failure(&self) {
        let mut inner = self.lock();
        inner.metrics.failed_requests += 1;
        inner.failure_count += 1;
        let trip = inner.state == BreakerState::HalfOpen
            || inner.failure_count >= self.failure_threshold;
        if trip && inner.state != BreakerState::Open {
            tracing::warn!(
                breaker = %self.name,
                failures = inner.failure_count,
                "circuit opened"
            );
            inner.state = BreakerState::Open;
            inner.opened_at = Some(Instant::now());
        }
    }

    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            metrics: inner.metrics.clone(),
        }
    }

    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = BreakerState::Closed;
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.opened_at = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // 锁内不会 panic，中毒时沿用内部数据
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fail(breaker: &CircuitBreaker) -> Result<(), BreakerError<&'static str>> {
        breaker.call(|| async { Err::<(), _>("down") }).await
    }

    async fn succeed(breaker: &CircuitBreaker) -> Result<u32, BreakerError<&'static str>> {
        breaker.call(|| async { Ok::<_, &'static str>(7) }).await
    }

    #[tokio::test]
    async fn test_opens_after_threshold() {
        let breaker = CircuitBreaker::new("test", 2, Duration::from_secs(30), 3);
        assert!(matches!(fail(&breaker).await, Err(BreakerError::Inner("down"))));
        assert_eq!(breaker.state(), BreakerState::Closed);
        let _ = fail(&breaker).await;
        assert_eq!(breaker.state(), BreakerState::Open);

        let mut called = false;
        let result = breaker
            .call(|| {
                called = true;
                async { Ok::<_, &'static str>(()) }
            })
            .await;
        assert!(matches!(result, Err(BreakerError::Open(_))));
        assert!(!called);
        assert_eq!(breaker.snapshot().metrics.rejected_requests, 1);
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let breaker = CircuitBreaker::new("test", 2, Duration::from_secs(30), 3);
        let _ = fail(&breaker).await;
        assert_eq!(succeed(&breaker).await.unwrap(), 7);
        let _ = fail(&breaker).await;
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_recovery() {
        let breaker = CircuitBreaker::new("test", 1, Duration::from_secs(10), 3);
        let _ = fail(&breaker).await;
        assert_eq!(breaker.state(), BreakerState::Open);

        tokio::time::advance(Duration::from_secs(11)).await;
        succeed(&breaker).await.unwrap();
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        succeed(&breaker).await.unwrap();
        succeed(&breaker).await.unwrap();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens() {
        let breaker = CircuitBreaker::new("test", 1, Duration::from_secs(10), 3);
        let _ = fail(&breaker).await;
        tokio::time::advance(Duration::from_secs(10)).await;
        let _ = fail(&breaker).await;
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(matches!(succeed(&breaker).await, Err(BreakerError::Open(_))));
    }
}
