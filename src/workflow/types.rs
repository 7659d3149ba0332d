//! 执行计划与执行记录类型
//!
//! 定义步骤、步骤结果、执行记录、汇总结果等核心数据类型。
//! JSON 字段使用 camelCase，与委托服务返回的记录格式一致，缺失字段取默认值。

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type ExecutionId = String;
pub type StepId = String;

/// 步骤类型（封闭枚举，处理器注册表按此穷举分派）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum StepType {
    Analysis,
    DataCollection,
    AiProcessing,
    Processing,
    Communication,
    Reporting,
    /// 通用兜底；线上名称为 "execution"
    #[serde(rename = "execution")]
    Generic,
}

impl StepType {
    pub const ALL: [StepType; 7] = [
        StepType::Analysis,
        StepType::DataCollection,
        StepType::AiProcessing,
        StepType::Processing,
        StepType::Communication,
        StepType::Reporting,
        StepType::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Analysis => "analysis",
            StepType::DataCollection => "data_collection",
            StepType::AiProcessing => "ai_processing",
            StepType::Processing => "processing",
            StepType::Communication => "communication",
            StepType::Reporting => "reporting",
            StepType::Generic => "execution",
        }
    }

    /// 解析线上名称；未知名称归为 Generic
    pub fn parse(s: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .unwrap_or(StepType::Generic)
    }
}

impl From<String> for StepType {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 步骤状态：Pending → Running → Completed | Failed，只迁移一次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }
}

/// 执行状态：Running → Completed | Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

/// 执行来源：委托服务完成，或本地回退路径
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionType {
    #[serde(alias = "enterprise_backend")]
    Delegated,
    #[serde(alias = "frontend_fallback")]
    LocalFallback,
}

/// 单个步骤处理器的结果；error 仅在 success=false 时存在
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub message: String,
    /// 供汇总使用的原始数据
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_data: Option<Value>,
}

impl StepResult {
    pub fn ok(data: Value, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            error: None,
            message: message.into(),
            real_data: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            data: Value::Null,
            message: format!("Step failed: {error}"),
            error: Some(error),
            real_data: None,
        }
    }

    pub fn with_real_data(mut self, real_data: Value) -> Self {
        self.real_data = Some(real_data);
        self
    }
}

/// 执行计划中的一个步骤
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStep {
    pub id: StepId,
    pub action: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// 失败时终止整个执行
    #[serde(default)]
    pub critical: bool,
    pub status: StepStatus,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result: Option<StepResult>,
}

impl ExecutionStep {
    pub fn new(
        id: impl Into<StepId>,
        action: impl Into<String>,
        description: impl Into<String>,
        step_type: StepType,
        critical: bool,
    ) -> Self {
        Self {
            id: id.into(),
            action: action.into(),
            description: description.into(),
            step_type,
            critical,
            status: StepStatus::Pending,
            start_time: None,
            end_time: None,
            result: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == StepStatus::Completed
    }
}

/// 单步摘要（汇总结果中的 detailedResults）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDigest {
    pub step: String,
    pub status: StepStatus,
    pub result: String,
    pub has_real_data: bool,
}

/// 执行完成后的汇总
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompiledResult {
    pub agent_name: String,
    pub total_steps: usize,
    pub successful_steps: usize,
    pub failed_steps: usize,
    /// successful / total，取值 [0, 1]
    pub success_rate: f64,
    pub execution_summary: String,
    pub real_insights: Vec<String>,
    pub data_collected: usize,
    pub detailed_results: Vec<StepDigest>,
    pub timestamp: DateTime<Utc>,
}

impl Default for CompiledResult {
    fn default() -> Self {
        Self {
            agent_name: String::new(),
            total_steps: 0,
            successful_steps: 0,
            failed_steps: 0,
            success_rate: 0.0,
            execution_summary: String::new(),
            real_insights: Vec::new(),
            data_collected: 0,
            detailed_results: Vec::new(),
            timestamp: Utc::now(),
        }
    }
}

/// 一次执行的运行状态记录
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: ExecutionId,
    pub agent_id: String,
    #[serde(default)]
    pub agent_name: String,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub steps: Vec<ExecutionStep>,
    /// 仅在 Completed 时设置
    #[serde(default)]
    pub result: Option<CompiledResult>,
    /// 仅在 Failed 时设置
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub real_data: Vec<Value>,
    #[serde(default = "default_execution_type")]
    pub execution_type: ExecutionType,
}

fn default_execution_type() -> ExecutionType {
    ExecutionType::Delegated
}

impl ExecutionRecord {
    /// 新建运行中的记录，id 形如 exec_<uuid>
    pub fn start(agent_id: impl Into<String>, agent_name: impl Into<String>) -> Self {
        Self {
            id: format!("exec_{}", uuid::Uuid::new_v4().simple()),
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            status: ExecutionStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            steps: Vec::new(),
            result: None,
            error: None,
            real_data: Vec::new(),
            execution_type: ExecutionType::LocalFallback,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status != ExecutionStatus::Running
    }

    /// 终态只设置一次；已结束的记录保持不变
    pub fn complete(&mut self, result: CompiledResult) {
        if self.is_finished() {
            return;
        }
        self.status = ExecutionStatus::Completed;
        self.result = Some(result);
        self.error = None;
        self.end_time = Some(Utc::now());
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        if self.is_finished() {
            return;
        }
        self.status = ExecutionStatus::Failed;
        self.result = None;
        self.error = Some(error.into());
        self.end_time = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&StepType::DataCollection).unwrap(),
            "\"data_collection\""
        );
        assert_eq!(serde_json::to_string(&StepType::Generic).unwrap(), "\"execution\"");
        let t: StepType = serde_json::from_str("\"ai_processing\"").unwrap();
        assert_eq!(t, StepType::AiProcessing);
        let t: StepType = serde_json::from_str("\"something_else\"").unwrap();
        assert_eq!(t, StepType::Generic);
    }

    #[test]
    fn test_terminal_state_set_once() {
        let mut record = ExecutionRecord::start("a1", "Agent");
        record.fail("boom");
        record.complete(CompiledResult::default());
        assert_eq!(record.status, ExecutionStatus::Failed);
        assert!(record.result.is_none());
        assert_eq!(record.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_decode_delegate_record() {
        let json = r#"{
            "id": "exec_1700000000000_abc",
            "agentId": "a1",
            "agentName": "Scout",
            "status": "completed",
            "startTime": "2024-01-01T00:00:00.000Z",
            "endTime": "2024-01-01T00:00:05.000Z",
            "steps": [{
                "id": "step_final",
                "action": "generate_report",
                "description": "Generate comprehensive report",
                "type": "reporting",
                "status": "completed",
                "result": {"success": true, "data": {}, "message": "done"}
            }],
            "result": {
                "agentName": "Scout", "totalSteps": 1, "successfulSteps": 1, "successRate": 1.0
            },
            "realData": [],
            "executionType": "enterprise_backend"
        }"#;
        let record: ExecutionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, ExecutionStatus::Completed);
        assert_eq!(record.execution_type, ExecutionType::Delegated);
        assert!(!record.steps[0].critical);
        let result = record.result.unwrap();
        assert_eq!(result.failed_steps, 0);
        assert_eq!(result.successful_steps, 1);
    }
}
