//! 步骤执行器
//!
//! 持有 HandlerRegistry，按步骤类型分派。处理器返回 Err 或 panic 都转为失败的 StepResult，
//! 执行器本身从不向外返回错误。状态迁移 Pending → Running → Completed | Failed 只发生一次。

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use chrono::Utc;
use futures_util::FutureExt;

use crate::steps::{HandlerRegistry, StepContext};
use crate::workflow::{ExecutionStep, StepResult, StepStatus};

pub struct StepExecutor {
    registry: HandlerRegistry,
}

impl StepExecutor {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry }
    }

    /// Pending → Running 并记录开始时间；步骤不处于 Pending 时返回 false
    pub fn start(step: &mut ExecutionStep) -> bool {
        if step.status != StepStatus::Pending {
            tracing::warn!(
                step = %step.id,
                status = ?step.status,
                "step already started, skipping"
            );
            return false;
        }
        step.status = StepStatus::Running;
        step.start_time = Some(Utc::now());
        true
    }

    /// 调用处理器并把一切异常收敛为 StepResult
    pub async fn dispatch(&self, step: &ExecutionStep, ctx: &StepContext<'_>) -> StepResult {
        let handler = self.registry.handler_for(step.step_type);
        let started = Instant::now();
        let outcome = AssertUnwindSafe(handler.run(step, ctx)).catch_unwind().await;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => StepResult::failed(e),
            Err(panic) => {
                StepResult::failed(format!("handler panicked: {}", panic_message(&panic)))
            }
        };
        tracing::info!(
            step = %step.id,
            step_type = %step.step_type,
            success = result.success,
            duration_ms = started.elapsed().as_millis() as u64,
            "step finished"
        );
        if let Some(error) = &result.error {
            tracing::warn!(step = %step.id, error = %error, "step failed");
        }
        result
    }

    /// Running → Completed | Failed 并记录结束时间
    pub fn finish(step: &mut ExecutionStep, result: StepResult) {
        if step.status != StepStatus::Running {
            return;
        }
        step.status = if result.success {
            StepStatus::Completed
        } else {
            StepStatus::Failed
        };
        step.end_time = Some(Utc::now());
        step.result = Some(result);
    }

    /// start + dispatch + finish；返回步骤是否成功
    pub async fn execute(&self, step: &mut ExecutionStep, ctx: &StepContext<'_>) -> bool {
        if !Self::start(step) {
            return step.succeeded();
        }
        let result = self.dispatch(step, ctx).await;
        Self::finish(step, result);
        step.succeeded()
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;
    use crate::agent::AgentDescriptor;
    use crate::clients::{ClientError, JsonFetcher};
    use crate::steps::StepHandler;
    use crate::workflow::StepType;

    struct NoFetch;

    #[async_trait]
    impl JsonFetcher for NoFetch {
        async fn get_json(&self, url: &str) -> Result<Value, ClientError> {
            Err(ClientError::Request(format!("offline: {url}")))
        }
    }

    struct Failing;

    #[async_trait]
    impl StepHandler for Failing {
        async fn run(
            &self,
            _step: &ExecutionStep,
            _ctx: &StepContext<'_>,
        ) -> Result<StepResult, String> {
            Err("disk full".to_string())
        }
    }

    struct Panicking;

    #[async_trait]
    impl StepHandler for Panicking {
        async fn run(
            &self,
            _step: &ExecutionStep,
            _ctx: &StepContext<'_>,
        ) -> Result<StepResult, String> {
            panic!("handler exploded");
        }
    }

    fn executor() -> StepExecutor {
        let registry = HandlerRegistry::new(Arc::new(NoFetch), vec![], None, vec![])
            .with_handler(StepType::Communication, Arc::new(Failing))
            .with_handler(StepType::Processing, Arc::new(Panicking));
        StepExecutor::new(registry)
    }

    #[tokio::test]
    async fn test_success_sets_timestamps() {
        let agent = AgentDescriptor::new("a1", "Agent").with_task("summarize quarterly numbers");
        let ctx = StepContext::new(&agent, &[]);
        let mut step =
            ExecutionStep::new("step_1", "analyze", "Analyze task", StepType::Analysis, false);

        assert!(executor().execute(&mut step, &ctx).await);
        assert_eq!(step.status, StepStatus::Completed);
        assert!(step.start_time.is_some());
        assert!(step.end_time >= step.start_time);
        assert!(step.result.as_ref().unwrap().error.is_none());
    }

    #[tokio::test]
    async fn test_error_becomes_failed_step() {
        let agent = AgentDescriptor::new("a1", "Agent");
        let ctx = StepContext::new(&agent, &[]);
        let mut step =
            ExecutionStep::new("step_1", "send", "Notify", StepType::Communication, true);

        assert!(!executor().execute(&mut step, &ctx).await);
        assert_eq!(step.status, StepStatus::Failed);
        let result = step.result.unwrap();
        assert_eq!(result.error.as_deref(), Some("disk full"));
        assert_eq!(result.message, "Step failed: disk full");
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let agent = AgentDescriptor::new("a1", "Agent");
        let inputs = [json!({"n": 1})];
        let ctx = StepContext::new(&agent, &inputs);
        let mut step =
            ExecutionStep::new("step_1", "process", "Process", StepType::Processing, false);

        assert!(!executor().execute(&mut step, &ctx).await);
        assert_eq!(step.status, StepStatus::Failed);
        assert!(step.result.unwrap().error.unwrap().contains("handler exploded"));
        assert!(step.end_time.is_some());
    }

    #[tokio::test]
    async fn test_step_runs_only_once() {
        let agent = AgentDescriptor::new("a1", "Agent");
        let ctx = StepContext::new(&agent, &[]);
        let mut step =
            ExecutionStep::new("step_1", "send", "Notify", StepType::Communication, false);
        let exec = executor();

        exec.execute(&mut step, &ctx).await;
        let first_end = step.end_time;
        exec.execute(&mut step, &ctx).await;
        assert_eq!(step.end_time, first_end);
        assert_eq!(step.status, StepStatus::Failed);
    }
}
