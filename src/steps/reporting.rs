//! 报告步骤：根据前序步骤的原始数据生成模板化洞察与建议，不访问外部服务

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use crate::steps::{StepContext, StepHandler};
use crate::workflow::{ExecutionStep, StepResult};

const RECOMMENDATIONS: &[&str] = &[
    "Schedule this agent to run periodically to track changes over time",
    "Add more data sources to broaden coverage",
    "Review failed sources and adjust timeouts if they recur",
    "Configure a classifier API key for model-based text analysis",
];

const NEXT_ACTIONS: usize = 3;

pub struct ReportingHandler;

#[async_trait]
impl StepHandler for ReportingHandler {
    async fn run(
        &self,
        _step: &ExecutionStep,
        ctx: &StepContext<'_>,
    ) -> Result<StepResult, String> {
        let insights = build_insights(ctx);
        let recommendations: Vec<&str> = RECOMMENDATIONS.to_vec();

        let data = json!({
            "report_title": format!("{} execution report", ctx.agent.name),
            "insights": insights,
            "recommendations": recommendations,
            "next_actions": &recommendations[..NEXT_ACTIONS],
            "generated_at": Utc::now(),
        });
        let message = format!("Report generated with {} insights", insights.len());
        Ok(StepResult::ok(data, message).with_real_data(json!({
            "insights": insights,
            "recommendations": recommendations,
        })))
    }
}

fn build_insights(ctx: &StepContext<'_>) -> Vec<String> {
    let mut insights = Vec::new();

    let sources: Vec<&Value> = ctx
        .prior_real_data
        .iter()
        .filter_map(Value::as_array)
        .flatten()
        .filter(|item| item.get("source").is_some())
        .collect();
    if sources.is_empty() {
        insights.push("No external data was collected in this run".to_string());
    } else {
        let ok = sources
            .iter()
            .filter(|item| item.get("status").and_then(Value::as_str) == Some("success"))
            .count();
        insights.push(format!("Collected data from {ok} of {} sources", sources.len()));
    }

    for data in ctx.prior_real_data {
        if let Some(sentiment) = data.get("sentiment").and_then(Value::as_str) {
            insights.push(format!("Task text reads as {sentiment}"));
        }
        if let Some(stats) = data.get("statistics") {
            if let (Some(n), Some(mean)) = (
                stats.get("sample_size").and_then(Value::as_u64),
                stats.get("mean").and_then(Value::as_f64),
            ) {
                insights.push(format!("Statistics over {n} data points, mean {mean}"));
            }
        }
    }

    if !ctx.agent.task_input.trim().is_empty() {
        insights.push(format!("Task processed for agent '{}'", ctx.agent.name));
    }
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentDescriptor;
    use crate::workflow::StepType;

    fn step() -> ExecutionStep {
        ExecutionStep::new("step_final", "generate_insights", "Report", StepType::Reporting, false)
    }

    #[tokio::test]
    async fn test_insights_reflect_prior_steps() {
        let agent = AgentDescriptor::new("a1", "Scout").with_task("watch prices");
        let prior = vec![
            json!([
                {"source": "https://a", "status": "success"},
                {"source": "https://b", "status": "failed"}
            ]),
            json!({"sentiment": "positive"}),
            json!({"statistics": {"sample_size": 4, "mean": 2.5}}),
        ];
        let result = ReportingHandler
            .run(&step(), &StepContext::new(&agent, &prior))
            .await
            .unwrap();

        let real = result.real_data.unwrap();
        let insights: Vec<&str> = real["insights"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(insights[0], "Collected data from 1 of 2 sources");
        assert!(insights.contains(&"Task text reads as positive"));
        assert!(insights.contains(&"Statistics over 4 data points, mean 2.5"));
        assert_eq!(result.data["next_actions"].as_array().unwrap().len(), NEXT_ACTIONS);
    }

    #[tokio::test]
    async fn test_report_without_data() {
        let agent = AgentDescriptor::new("a1", "Scout");
        let result = ReportingHandler.run(&step(), &StepContext::new(&agent, &[])).await.unwrap();
        assert!(result.success);
        assert_eq!(
            result.real_data.unwrap()["insights"][0],
            "No external data was collected in this run"
        );
    }
}
