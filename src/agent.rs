//! Agent 描述
//!
//! AgentDescriptor 是外部（UI / 调用方）传入的只读描述：名称、任务文本、技能标签；
//! 可选携带外部任务拆解（plan），此时计划按动作关键词推断步骤类型。

use serde::{Deserialize, Serialize};

/// 单次执行期间不可变的 Agent 描述
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDescriptor {
    pub id: String,
    pub name: String,
    /// 自由文本任务描述
    #[serde(default, alias = "task_input")]
    pub task_input: String,
    /// 能力标签，如 web-scraping / text-classification / data-analysis
    #[serde(default)]
    pub skills: Vec<String>,
    /// 仅作展示，逻辑不使用
    #[serde(default)]
    pub model: Option<String>,
    /// 外部（AI 拆解）给出的步骤列表；存在时替代技能规则
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Vec<PlannedAction>>,
}

impl AgentDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            task_input: String::new(),
            skills: Vec::new(),
            model: None,
            plan: None,
        }
    }

    pub fn with_task(mut self, task_input: impl Into<String>) -> Self {
        self.task_input = task_input.into();
        self
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_plan(mut self, plan: Vec<PlannedAction>) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.iter().any(|s| s.eq_ignore_ascii_case(skill))
    }
}

/// 外部任务拆解中的一个动作
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedAction {
    pub action: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub critical: bool,
}

impl PlannedAction {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            description: String::new(),
            critical: false,
        }
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_from_ui_json() {
        let json = r#"{
            "id": "agent_1",
            "name": "Market Watcher",
            "task_input": "collect prices",
            "skills": ["web-scraping"],
            "model": "facebook/bart-large-mnli"
        }"#;
        let agent: AgentDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(agent.task_input, "collect prices");
        assert!(agent.has_skill("Web-Scraping"));
        assert!(agent.plan.is_none());
    }
}
