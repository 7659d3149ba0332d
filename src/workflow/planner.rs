//! 计划生成器
//!
//! 两种模式：
//! - **技能规则**：按 Agent 声明的技能依次追加采集 / AI 处理 / 统计步骤，总是以报告步骤收尾，计划永不为空；
//! - **动作关键词**：外部任务拆解给出的动作列表，按关键词推断步骤类型。

use crate::agent::{AgentDescriptor, PlannedAction};
use crate::workflow::types::{ExecutionStep, StepType};
use crate::workflow::WorkflowError;

const DATA_COLLECTION_SKILLS: &[&str] = &["web-scraping", "data-collection"];
const AI_SKILLS: &[&str] = &["text-classification", "ai-processing"];
const ANALYSIS_SKILLS: &[&str] = &["data-analysis"];

/// 关键词 → 步骤类型；按顺序匹配，先到先得
const ACTION_KEYWORDS: &[(&[&str], StepType)] = &[
    (&["analyze", "review"], StepType::Analysis),
    (&["collect", "scrape", "fetch"], StepType::DataCollection),
    (&["classify", "generate", "ai"], StepType::AiProcessing),
    (&["process", "transform"], StepType::Processing),
    (&["send", "notify", "email"], StepType::Communication),
    (&["report", "summary"], StepType::Reporting),
];

/// 无状态的计划生成器
#[derive(Debug, Default, Clone, Copy)]
pub struct PlanBuilder;

impl PlanBuilder {
    pub fn new() -> Self {
        Self
    }

    /// 根据描述选择模式：带外部拆解时用关键词模式，否则用技能规则
    pub fn build(&self, agent: &AgentDescriptor) -> Result<Vec<ExecutionStep>, WorkflowError> {
        match &agent.plan {
            Some(actions) => self.from_actions(actions),
            None => Ok(self.from_skills(agent)),
        }
    }

    /// 技能规则：同一描述总是得到同样的步骤类型序列
    pub fn from_skills(&self, agent: &AgentDescriptor) -> Vec<ExecutionStep> {
        let has_any = |skills: &[&str]| skills.iter().any(|s| agent.has_skill(s));
        let mut steps = Vec::new();

        if has_any(DATA_COLLECTION_SKILLS) {
            steps.push(ExecutionStep::new(
                next_id(&steps),
                "fetch_web_data",
                "Fetch data from accessible APIs",
                StepType::DataCollection,
                true,
            ));
        }

        if has_any(AI_SKILLS) {
            steps.push(ExecutionStep::new(
                next_id(&steps),
                "ai_text_analysis",
                "Process text with AI models",
                StepType::AiProcessing,
                true,
            ));
        }

        if has_any(ANALYSIS_SKILLS) {
            steps.push(ExecutionStep::new(
                next_id(&steps),
                "analyze_data",
                "Perform statistical analysis",
                StepType::Processing,
                false,
            ));
        }

        steps.push(ExecutionStep::new(
            "step_final",
            "generate_insights",
            "Generate actionable insights",
            StepType::Reporting,
            false,
        ));

        steps
    }

    /// 关键词模式：空拆解视为计划构建失败
    pub fn from_actions(
        &self,
        actions: &[PlannedAction],
    ) -> Result<Vec<ExecutionStep>, WorkflowError> {
        if actions.is_empty() {
            return Err(WorkflowError::EmptyPlan);
        }

        actions
            .iter()
            .enumerate()
            .map(|(index, planned)| {
                let action = planned.action.trim();
                if action.is_empty() {
                    return Err(WorkflowError::InvalidConfiguration(format!(
                        "action #{} has no name",
                        index + 1
                    )));
                }
                Ok(ExecutionStep::new(
                    format!("step_{}", index + 1),
                    action,
                    planned.description.clone(),
                    infer_step_type(action),
                    planned.critical,
                ))
            })
            .collect()
    }
}

/// 根据动作名推断步骤类型，无匹配时为 Generic
pub fn infer_step_type(action: &str) -> StepType {
    let action = action.to_lowercase();
    ACTION_KEYWORDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| action.contains(k)))
        .map(|(_, step_type)| *step_type)
        .unwrap_or(StepType::Generic)
}

fn next_id(steps: &[ExecutionStep]) -> String {
    format!("step_{}", steps.len() + 1)
}
