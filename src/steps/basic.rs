//! 无外部依赖的步骤：任务分析、通信占位、通用兜底

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::analysis::sentiment::tokenize;
use crate::steps::{StepContext, StepHandler};
use crate::workflow::{ExecutionStep, StepResult};

/// 每个子步骤大约覆盖的任务词数
const WORDS_PER_STEP: usize = 15;

/// 任务复杂度：词数 > 50 为 High，> 25 为 Medium，否则 Low
pub fn complexity_for(word_count: usize) -> &'static str {
    if word_count > 50 {
        "High"
    } else if word_count > 25 {
        "Medium"
    } else {
        "Low"
    }
}

pub fn estimated_steps(word_count: usize) -> usize {
    word_count.div_ceil(WORDS_PER_STEP)
}

pub struct AnalysisHandler;

#[async_trait]
impl StepHandler for AnalysisHandler {
    async fn run(
        &self,
        _step: &ExecutionStep,
        ctx: &StepContext<'_>,
    ) -> Result<StepResult, String> {
        let word_count = tokenize(&ctx.agent.task_input).len();
        let complexity = complexity_for(word_count);
        let data = json!({
            "complexity": complexity,
            "word_count": word_count,
            "estimated_steps": estimated_steps(word_count),
            "skills": ctx.agent.skills,
        });
        Ok(StepResult::ok(data, format!("Task analyzed: {complexity} complexity")))
    }
}

/// 没有外发通道，只记录消息已准备
pub struct CommunicationHandler;

#[async_trait]
impl StepHandler for CommunicationHandler {
    async fn run(&self, step: &ExecutionStep, ctx: &StepContext<'_>) -> Result<StepResult, String> {
        let data = json!({
            "channel": "none",
            "delivery_status": "prepared",
            "subject": format!("{}: {}", ctx.agent.name, step.description),
            "prepared_at": Utc::now(),
        });
        Ok(StepResult::ok(data, "Message prepared (no outbound channel configured)"))
    }
}

pub struct GenericHandler;

#[async_trait]
impl StepHandler for GenericHandler {
    async fn run(
        &self,
        step: &ExecutionStep,
        _ctx: &StepContext<'_>,
    ) -> Result<StepResult, String> {
        let data = json!({
            "step_completed": true,
            "action": step.action,
            "completed_at": Utc::now(),
        });
        Ok(StepResult::ok(data, format!("Step '{}' completed", step.action)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentDescriptor;
    use crate::workflow::StepType;

    #[test]
    fn test_complexity_thresholds() {
        assert_eq!(complexity_for(10), "Low");
        assert_eq!(complexity_for(25), "Low");
        assert_eq!(complexity_for(26), "Medium");
        assert_eq!(complexity_for(51), "High");
        assert_eq!(estimated_steps(0), 0);
        assert_eq!(estimated_steps(16), 2);
    }

    #[tokio::test]
    async fn test_analysis_reports_complexity() {
        let agent = AgentDescriptor::new("a1", "Agent").with_task("collect and rank the top posts");
        let step = ExecutionStep::new("step_1", "analyze", "Analyze", StepType::Analysis, false);
        let result = AnalysisHandler.run(&step, &StepContext::new(&agent, &[])).await.unwrap();
        assert_eq!(result.data["complexity"], "Low");
        assert_eq!(result.data["word_count"], 6);
        assert_eq!(result.data["estimated_steps"], 1);
        assert!(result.real_data.is_none());
    }

    #[tokio::test]
    async fn test_generic_marks_completion() {
        let agent = AgentDescriptor::new("a1", "Agent");
        let step = ExecutionStep::new("step_2", "archive", "Archive", StepType::Generic, false);
        let result = GenericHandler.run(&step, &StepContext::new(&agent, &[])).await.unwrap();
        assert_eq!(result.data["step_completed"], true);
        assert_eq!(result.message, "Step 'archive' completed");
    }
}
