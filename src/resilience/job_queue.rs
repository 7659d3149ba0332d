//! 优先级任务队列
//!
//! 高优先级先出，同优先级先进先出；drain 以有限并发消费队列，
//! 处理失败的任务重新入队，直到达到 max_attempts 后计为失败。

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::task::JoinSet;

pub type JobId = String;

#[derive(Debug, Clone)]
pub struct QueuedJob<J> {
    pub id: JobId,
    pub payload: J,
    pub priority: i32,
    pub attempts: u32,
    pub max_attempts: u32,
    seq: u64,
}

impl<J> PartialEq for QueuedJob<J> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl<J> Eq for QueuedJob<J> {}

impl<J> PartialOrd for QueuedJob<J> {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl<J> Ord for QueuedJob<J> {
    // 大顶堆：优先级高者在前，同优先级 seq 小者在前
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueMetrics {
    pub processed: u64,
    pub failed: u64,
    pub retried: u64,
    pub pending: usize,
}

#[derive(Debug)]
pub struct JobQueue<J> {
    heap: Mutex<BinaryHeap<QueuedJob<J>>>,
    metrics: Mutex<QueueMetrics>,
    next_seq: AtomicU64,
    max_attempts: u32,
}

impl<J> JobQueue<J>
where
    J: Send + 'static,
{
    pub fn new(max_attempts: u32) -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            metrics: Mutex::new(QueueMetrics::default()),
            next_seq: AtomicU64::new(0),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn enqueue(&self, payload: J, priority: i32) -> JobId {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let id = format!("job_{}", uuid::Uuid::new_v4().simple());
        self.push(QueuedJob {
            id: id.clone(),
            payload,
            priority,
            attempts: 0,
            max_attempts: self.max_attempts,
            seq,
        });
        id
    }

    pub fn pop(&self) -> Option<QueuedJob<J>> {
        self.lock_heap().pop()
    }

    pub fn len(&self) -> usize {
        self.lock_heap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> QueueMetrics {
        let mut metrics = self.lock_metrics().clone();
        metrics.pending = self.len();
        metrics
    }

    fn push(&self, job: QueuedJob<J>) {
        self.lock_heap().push(job);
    }

    /// 以最多 concurrency 个并发消费队列直到清空（含重试），返回最终指标
    pub async fn drain<F, Fut>(self: Arc<Self>, concurrency: usize, processor: F) -> QueueMetrics
    where
        F: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
        J: Clone,
    {
        let processor = Arc::new(processor);
        let concurrency = concurrency.max(1);
        let mut in_flight = JoinSet::new();

        loop {
            while in_flight.len() < concurrency {
                let Some(job) = self.pop() else { break };
                let processor = Arc::clone(&processor);
                in_flight.spawn(async move {
                    let outcome = processor(job.payload.clone()).await;
                    (job, outcome)
                });
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };

            match joined {
                Ok((job, Ok(()))) => {
                    tracing::debug!(job = %job.id, "job processed");
                    self.lock_metrics().processed += 1;
                }
                Ok((mut job, Err(e))) => {
                    job.attempts += 1;
                    if job.attempts < job.max_attempts {
                        tracing::warn!(
                            job = %job.id,
                            attempt = job.attempts,
                            error = %e,
                            "job failed, re-queued"
                        );
                        self.lock_metrics().retried += 1;
                        self.push(job);
                    } else {
                        tracing::error!(
                            job = %job.id,
                            attempts = job.attempts,
                            error = %e,
                            "job failed permanently"
                        );
                        self.lock_metrics().failed += 1;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "job worker panicked");
                    self.lock_metrics().failed += 1;
                }
            }
        }

        self.metrics()
    }

    fn lock_heap(&self) -> std::sync::MutexGuard<'_, BinaryHeap<QueuedJob<J>>> {
        self.heap.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_metrics(&self) -> std::sync::MutexGuard<'_, QueueMetrics> {
        self.metrics.lock().unwrap_or_else(|e| e.into_inner())
    }
}
