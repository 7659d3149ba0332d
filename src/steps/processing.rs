//! 数据处理步骤：对数据采集步骤成功取回的数值做描述性统计
//!
//! 只使用逐源结果中 status 为 success 的 data 字段，其他步骤的元数据（置信度、词数等）不计入。
//! 没有任何数值输入时步骤失败，不编造数据。

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::analysis::statistics::MAX_SAMPLES;
use crate::analysis::{collect_numbers, describe};
use crate::steps::{StepContext, StepHandler};
use crate::workflow::{ExecutionStep, StepResult};

pub struct ProcessingHandler;

/// 前序步骤 real_data 中成功采集的源数据
fn collected_payloads<'a>(prior: &'a [Value]) -> impl Iterator<Item = &'a Value> + 'a {
    prior
        .iter()
        .filter_map(Value::as_array)
        .flatten()
        .filter(|item| item.get("source").is_some())
        .filter(|item| item.get("status").and_then(Value::as_str) == Some("success"))
        .filter_map(|item| item.get("data"))
}

#[async_trait]
impl StepHandler for ProcessingHandler {
    async fn run(
        &self,
        _step: &ExecutionStep,
        ctx: &StepContext<'_>,
    ) -> Result<StepResult, String> {
        let mut samples = Vec::new();
        let mut sources = 0usize;
        for payload in collected_payloads(ctx.prior_real_data) {
            sources += 1;
            collect_numbers(payload, MAX_SAMPLES, &mut samples);
        }

        let summary = describe(&samples)
            .ok_or_else(|| "no numeric data collected by earlier steps".to_string())?;
        let statistics = serde_json::to_value(&summary).map_err(|e| e.to_string())?;
        let data = json!({
            "statistics": statistics,
            "sources": sources,
        });
        let message = format!(
            "Processed {} data points (mean {}, std {})",
            summary.sample_size, summary.mean, summary.std_deviation
        );
        Ok(StepResult::ok(data, message).with_real_data(json!({ "statistics": statistics })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentDescriptor;
    use crate::workflow::StepType;

    fn step() -> ExecutionStep {
        ExecutionStep::new("step_3", "analyze_data", "Statistics", StepType::Processing, false)
    }

    #[tokio::test]
    async fn test_statistics_over_collected_data() {
        let agent = AgentDescriptor::new("a1", "Agent");
        let prior = vec![
            json!([
                {"source": "a", "status": "success", "data": {"stars": 2, "forks": 4}},
                {"source": "b", "status": "success", "data": [6]},
                {"source": "c", "status": "failed", "error": "HTTP 503"}
            ]),
            json!({"sentiment": "positive", "confidence": 0.8, "word_count": 12}),
        ];
        let result = ProcessingHandler
            .run(&step(), &StepContext::new(&agent, &prior))
            .await
            .unwrap();

        assert!(result.success);
        let stats = &result.data["statistics"];
        assert_eq!(stats["sample_size"], 3);
        assert_eq!(stats["mean"], 4.0);
        assert_eq!(stats["min"], 2.0);
        assert_eq!(stats["max"], 6.0);
        // 按文档顺序 2, 4, 6 单调上升
        assert_eq!(stats["correlation"], 1.0);
        assert_eq!(result.data["sources"], 2);
    }

    #[tokio::test]
    async fn test_analysis_metadata_is_not_data() {
        let agent = AgentDescriptor::new("a1", "Agent");
        let prior = vec![json!({
            "sentiment": "neutral",
            "confidence": 0.6,
            "word_count": 9,
            "keywords": [{"word": "market", "count": 3}]
        })];
        let result = ProcessingHandler.run(&step(), &StepContext::new(&agent, &prior)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_failed_sources_only_fails() {
        let agent = AgentDescriptor::new("a1", "Agent");
        let prior = vec![json!([{"source": "a", "status": "failed", "error": "timeout"}])];
        let result = ProcessingHandler.run(&step(), &StepContext::new(&agent, &prior)).await;
        assert!(result.is_err());
    }
}
