//! 执行记录存储
//!
//! 运行中的记录按执行 id 存放；结束的记录移入有界历史（最旧的先淘汰）。
//! 并发执行共享同一个存储，各自只写自己的记录。

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::workflow::{ExecutionId, ExecutionRecord};

/// 执行记录存储接口
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// 写入或覆盖运行中的记录
    async fn upsert_running(&self, record: ExecutionRecord);

    /// 移除 running_id 对应的运行中记录，并把结束的记录追加到历史
    async fn finish(&self, running_id: &str, record: ExecutionRecord);

    /// 该 Agent 最近开始的运行中记录
    async fn running_for_agent(&self, agent_id: &str) -> Option<ExecutionRecord>;

    /// 该 Agent 最近结束的记录
    async fn latest_for_agent(&self, agent_id: &str) -> Option<ExecutionRecord>;

    async fn running(&self) -> Vec<ExecutionRecord>;

    /// 历史记录，按结束顺序（旧 → 新）
    async fn history(&self) -> Vec<ExecutionRecord>;
}

/// 内存存储
pub struct InMemoryExecutionStore {
    running: RwLock<HashMap<ExecutionId, ExecutionRecord>>,
    history: RwLock<VecDeque<ExecutionRecord>>,
    history_limit: usize,
}

impl InMemoryExecutionStore {
    pub fn new(history_limit: usize) -> Self {
        Self {
            running: RwLock::new(HashMap::new()),
            history: RwLock::new(VecDeque::new()),
            history_limit: history_limit.max(1),
        }
    }
}

impl Default for InMemoryExecutionStore {
    fn default() -> Self {
        Self::new(50)
    }
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn upsert_running(&self, record: ExecutionRecord) {
        self.running.write().await.insert(record.id.clone(), record);
    }

    async fn finish(&self, running_id: &str, record: ExecutionRecord) {
        self.running.write().await.remove(running_id);
        let mut history = self.history.write().await;
        history.push_back(record);
        while history.len() > self.history_limit {
            history.pop_front();
        }
    }

    async fn running_for_agent(&self, agent_id: &str) -> Option<ExecutionRecord> {
        self.running
            .read()
            .await
            .values()
            .filter(|r| r.agent_id == agent_id)
            .max_by_key(|r| r.start_time)
            .cloned()
    }

    async fn latest_for_agent(&self, agent_id: &str) -> Option<ExecutionRecord> {
        self.history
            .read()
            .await
            .iter()
            .rev()
            .find(|r| r.agent_id == agent_id)
            .cloned()
    }

    async fn running(&self) -> Vec<ExecutionRecord> {
        let mut records: Vec<_> = self.running.read().await.values().cloned().collect();
        records.sort_by_key(|r| r.start_time);
        records
    }

    async fn history(&self) -> Vec<ExecutionRecord> {
        self.history.read().await.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::CompiledResult;

    #[tokio::test]
    async fn test_finish_moves_record_to_history() {
        let store = InMemoryExecutionStore::new(10);
        let mut record = ExecutionRecord::start("a1", "Agent");
        store.upsert_running(record.clone()).await;
        assert!(store.running_for_agent("a1").await.is_some());

        record.complete(CompiledResult::default());
        store.finish(&record.id.clone(), record).await;
        assert!(store.running_for_agent("a1").await.is_none());
        assert!(store.running().await.is_empty());
        assert!(store.latest_for_agent("a1").await.unwrap().is_finished());
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let store = InMemoryExecutionStore::new(3);
        for i in 0..5 {
            let mut record = ExecutionRecord::start(format!("a{i}"), "Agent");
            record.fail("x");
            store.finish(&record.id.clone(), record).await;
        }
        let history = store.history().await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].agent_id, "a2");
        assert!(store.latest_for_agent("a0").await.is_none());
    }

    #[tokio::test]
    async fn test_latest_prefers_newest() {
        let store = InMemoryExecutionStore::new(10);
        let mut first = ExecutionRecord::start("a1", "Agent");
        first.fail("first");
        let mut second = ExecutionRecord::start("a1", "Agent");
        second.complete(CompiledResult::default());
        store.finish(&first.id.clone(), first).await;
        store.finish(&second.id.clone(), second.clone()).await;
        assert_eq!(store.latest_for_agent("a1").await.unwrap().id, second.id);
    }
}
