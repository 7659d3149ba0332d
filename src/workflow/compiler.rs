//! 结果汇总
//!
//! 纯函数：把已结束的步骤列表归约为 CompiledResult（计数、成功率、摘要、洞察、逐步摘要）。

use chrono::Utc;
use serde_json::Value;

use crate::workflow::types::{CompiledResult, ExecutionStep, StepDigest, StepStatus};

/// 汇总中保留的洞察条数上限
pub const MAX_INSIGHTS: usize = 10;

pub fn compile_results(agent_name: &str, steps: &[ExecutionStep]) -> CompiledResult {
    let total_steps = steps.len();
    let successful_steps = steps.iter().filter(|s| s.status == StepStatus::Completed).count();
    let failed_steps = steps.iter().filter(|s| s.status == StepStatus::Failed).count();
    let success_rate = if total_steps == 0 {
        0.0
    } else {
        successful_steps as f64 / total_steps as f64
    };

    let real_data: Vec<&Value> = steps
        .iter()
        .filter_map(|s| s.result.as_ref().and_then(|r| r.real_data.as_ref()))
        .collect();

    let real_insights = real_data
        .iter()
        .flat_map(|data| insights_from(data))
        .take(MAX_INSIGHTS)
        .collect();

    let detailed_results = steps
        .iter()
        .map(|step| StepDigest {
            step: step.action.clone(),
            status: step.status,
            result: step
                .result
                .as_ref()
                .map(|r| r.message.clone())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "No result".to_string()),
            has_real_data: step.result.as_ref().is_some_and(|r| r.real_data.is_some()),
        })
        .collect();

    CompiledResult {
        agent_name: agent_name.to_string(),
        total_steps,
        successful_steps,
        failed_steps,
        success_rate,
        execution_summary: format!(
            "Execution completed: {successful_steps}/{total_steps} steps successful"
        ),
        real_insights,
        data_collected: real_data.len(),
        detailed_results,
        timestamp: Utc::now(),
    }
}

/// 从单步的 real_data 中提取可读洞察：
/// 数组逐项展开；对象取 insights 列表，否则取 sentiment
fn insights_from(data: &Value) -> Vec<String> {
    match data {
        Value::Array(items) => items.iter().map(describe_item).collect(),
        Value::Object(map) => {
            if let Some(Value::Array(insights)) = map.get("insights") {
                insights.iter().map(describe_item).collect()
            } else if let Some(sentiment) = map.get("sentiment").and_then(Value::as_str) {
                vec![format!("Sentiment: {sentiment}")]
            } else {
                Vec::new()
            }
        }
        _ => Vec::new(),
    }
}

fn describe_item(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        Value::Object(map) => match (
            map.get("source").and_then(Value::as_str),
            map.get("status").and_then(Value::as_str),
        ) {
            (Some(source), Some(status)) => format!("{source}: {status}"),
            _ => item.to_string(),
        },
        other => other.to_string(),
    }
}
