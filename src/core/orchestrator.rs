//! Agent 执行编排
//!
//! execute_agent：创建运行中的记录 → 选择执行路径（委托 / 本地）→ 本地路径下生成计划并按顺序执行步骤，
//! 关键步骤失败即终止，其余步骤保持 Pending → 汇总结果或写入错误 → 移入历史。
//! 该调用从不返回错误，所有失败都体现在返回的记录里。

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::agent::AgentDescriptor;
use crate::clients::{
    DelegateClient, HttpDelegate, HttpFetcher, HuggingFaceClassifier, TextClassifier,
};
use crate::config::AppConfig;
use crate::core::fallback::{select_path, ExecutionPath};
use crate::core::{ExecutionError, ExecutionStore, InMemoryExecutionStore};
use crate::resilience::CircuitBreaker;
use crate::steps::{HandlerRegistry, StepContext, StepExecutor};
use crate::workflow::{
    compile_results, ExecutionRecord, ExecutionStatus, ExecutionType, PlanBuilder,
};

/// Agent 当前状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// get_agent_status 的返回值：运行中的记录优先，其次最近一次历史记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    pub status: AgentState,
    pub execution: Option<ExecutionRecord>,
}

/// 单步执行后的计划走向
enum PlanOutcome {
    Continue,
    Abort(ExecutionError),
}

pub struct AgentExecutor {
    planner: PlanBuilder,
    steps: StepExecutor,
    store: Arc<dyn ExecutionStore>,
    delegate: Option<Arc<dyn DelegateClient>>,
}

impl AgentExecutor {
    pub fn new(steps: StepExecutor, store: Arc<dyn ExecutionStore>) -> Self {
        Self {
            planner: PlanBuilder::new(),
            steps,
            store,
            delegate: None,
        }
    }

    pub fn with_delegate(mut self, delegate: Arc<dyn DelegateClient>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// 按配置装配：HTTP 抓取 + 响应缓存、远程分类器（有 Key 时）、委托服务（启用时），各自带熔断器
    pub fn from_config(cfg: &AppConfig) -> Self {
        let fetcher = Arc::new(HttpFetcher::from_config(&cfg.collection));

        let classifier = HuggingFaceClassifier::from_config(
            &cfg.classifier,
            Arc::new(CircuitBreaker::from_config("classifier", &cfg.resilience)),
        );
        let classifier: Option<Arc<dyn TextClassifier>> = if classifier.has_credentials() {
            Some(Arc::new(classifier))
        } else {
            tracing::info!("No classifier API key configured, using lexical analysis");
            None
        };

        let registry = HandlerRegistry::new(
            fetcher,
            cfg.collection.sources.clone(),
            classifier,
            cfg.classifier.labels.clone(),
        );
        let store = Arc::new(InMemoryExecutionStore::new(cfg.executor.history_limit));
        let executor = Self::new(StepExecutor::new(registry), store);

        if cfg.delegate.enabled {
            let breaker = Arc::new(CircuitBreaker::from_config("delegate", &cfg.resilience));
            executor.with_delegate(Arc::new(HttpDelegate::from_config(&cfg.delegate, breaker)))
        } else {
            executor
        }
    }

    /// 执行一个 Agent，返回终态记录
    pub async fn execute_agent(&self, agent: &AgentDescriptor) -> ExecutionRecord {
        let mut record = ExecutionRecord::start(agent.id.clone(), agent.name.clone());
        self.store.upsert_running(record.clone()).await;
        tracing::info!(execution = %record.id, agent = %agent.id, "execution started");

        match select_path(self.delegate.as_deref(), agent).await {
            ExecutionPath::Delegated(delegated) => {
                tracing::info!(
                    execution = %delegated.id,
                    status = ?delegated.status,
                    "execution delegated"
                );
                self.store.finish(&record.id, delegated.clone()).await;
                return delegated;
            }
            ExecutionPath::LocalFallback(reason) => {
                tracing::info!(execution = %record.id, reason = %reason, "running locally");
            }
        }

        record.execution_type = ExecutionType::LocalFallback;
        match self.run_local(agent, &mut record).await {
            Ok(()) => {
                let result = compile_results(&agent.name, &record.steps);
                record.complete(result);
            }
            Err(e) => record.fail(e.to_string()),
        }

        tracing::info!(
            execution = %record.id,
            status = ?record.status,
            error = record.error.as_deref().unwrap_or(""),
            "execution finished"
        );
        self.store.finish(&record.id, record.clone()).await;
        record
    }

    async fn run_local(
        &self,
        agent: &AgentDescriptor,
        record: &mut ExecutionRecord,
    ) -> Result<(), ExecutionError> {
        record.steps = self.planner.build(agent)?;
        self.store.upsert_running(record.clone()).await;

        for index in 0..record.steps.len() {
            match self.run_step(agent, record, index).await {
                PlanOutcome::Continue => {}
                PlanOutcome::Abort(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn run_step(
        &self,
        agent: &AgentDescriptor,
        record: &mut ExecutionRecord,
        index: usize,
    ) -> PlanOutcome {
        if !StepExecutor::start(&mut record.steps[index]) {
            return PlanOutcome::Continue;
        }
        self.store.upsert_running(record.clone()).await;

        let ctx = StepContext::new(agent, &record.real_data);
        let result = self.steps.dispatch(&record.steps[index], &ctx).await;
        StepExecutor::finish(&mut record.steps[index], result);

        let step = &record.steps[index];
        let real_data = step.result.as_ref().and_then(|r| r.real_data.clone());
        let outcome = if step.critical && !step.succeeded() {
            PlanOutcome::Abort(ExecutionError::CriticalStepFailed {
                step: step.action.clone(),
                error: step
                    .result
                    .as_ref()
                    .and_then(|r| r.error.clone())
                    .unwrap_or_else(|| "unknown error".to_string()),
            })
        } else {
            PlanOutcome::Continue
        };

        if let Some(data) = real_data {
            record.real_data.push(data);
        }
        self.store.upsert_running(record.clone()).await;
        outcome
    }

    pub async fn agent_status(&self, agent_id: &str) -> AgentStatus {
        if let Some(record) = self.store.running_for_agent(agent_id).await {
            return AgentStatus {
                status: AgentState::Running,
                execution: Some(record),
            };
        }
        match self.store.latest_for_agent(agent_id).await {
            Some(record) => AgentStatus {
                status: match record.status {
                    ExecutionStatus::Running => AgentState::Running,
                    ExecutionStatus::Completed => AgentState::Completed,
                    ExecutionStatus::Failed => AgentState::Failed,
                },
                execution: Some(record),
            },
            None => AgentStatus {
                status: AgentState::Idle,
                execution: None,
            },
        }
    }

    pub async fn running_executions(&self) -> Vec<ExecutionRecord> {
        self.store.running().await
    }

    pub async fn execution_history(&self) -> Vec<ExecutionRecord> {
        self.store.history().await
    }
}
