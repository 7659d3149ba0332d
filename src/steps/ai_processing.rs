//! AI 处理步骤：对任务文本做分类 / 情感分析
//!
//! 配置了远程分类器且调用成功时使用远程结果；缺少凭据或任何调用失败都回退到本地词法分析，
//! 回退不会使步骤失败。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::analysis::{analyze_text, Sentiment};
use crate::clients::{LabelScore, TextClassifier};
use crate::steps::{preview, StepContext, StepHandler};
use crate::workflow::{ExecutionStep, StepResult};

const TEXT_PREVIEW_CHARS: usize = 100;
const LEXICAL_MODEL: &str = "lexical-sentiment";

pub struct AiProcessingHandler {
    classifier: Option<Arc<dyn TextClassifier>>,
    labels: Vec<String>,
}

impl AiProcessingHandler {
    pub fn new(classifier: Option<Arc<dyn TextClassifier>>, labels: Vec<String>) -> Self {
        Self { classifier, labels }
    }

    /// 远程分类；未配置、调用失败或返回空标签列表时为 None
    async fn classify_remote(&self, text: &str) -> Option<(String, LabelScore, Vec<LabelScore>)> {
        let classifier = self.classifier.as_ref()?;
        if self.labels.is_empty() || text.trim().is_empty() {
            return None;
        }
        match classifier.classify(text, &self.labels).await {
            Ok(scores) => match scores.first().cloned() {
                Some(top) => Some((classifier.model().to_string(), top, scores)),
                None => {
                    tracing::warn!(
                        model = %classifier.model(),
                        "remote classification returned no labels, using lexical analysis"
                    );
                    None
                }
            },
            Err(e) => {
                tracing::warn!(
                    model = %classifier.model(),
                    error = %e,
                    "remote classification unavailable, using lexical analysis"
                );
                None
            }
        }
    }
}

#[async_trait]
impl StepHandler for AiProcessingHandler {
    async fn run(
        &self,
        _step: &ExecutionStep,
        ctx: &StepContext<'_>,
    ) -> Result<StepResult, String> {
        let text = ctx.agent.task_input.as_str();
        let processed_text = preview(text, TEXT_PREVIEW_CHARS);

        if let Some((model, top, scores)) = self.classify_remote(text).await {
            let sentiment = sentiment_label(&top.label);
            let data = json!({
                "model": model,
                "classification": scores,
                "confidence": top.score,
                "processed_text": processed_text,
                "fallback": false,
            });
            let real_data = json!({
                "sentiment": sentiment,
                "label": top.label,
                "confidence": top.score,
            });
            return Ok(StepResult::ok(data, format!("Text classified as '{}'", top.label))
                .with_real_data(real_data));
        }

        let analysis = analyze_text(text);
        let data = json!({
            "model": LEXICAL_MODEL,
            "sentiment": analysis.sentiment,
            "confidence": analysis.confidence,
            "keywords": analysis.keywords,
            "word_count": analysis.word_count,
            "processed_text": processed_text,
            "fallback": true,
        });
        let real_data = serde_json::to_value(&analysis).map_err(|e| e.to_string())?;
        Ok(StepResult::ok(
            data,
            format!("Lexical analysis: {} sentiment", analysis.sentiment.as_str()),
        )
        .with_real_data(real_data))
    }
}

/// 远程标签若本身是情感标签则直接使用，否则记为 neutral
fn sentiment_label(label: &str) -> Value {
    let lower = label.to_lowercase();
    let sentiment = match lower.as_str() {
        "positive" => Sentiment::Positive,
        "negative" => Sentiment::Negative,
        _ => Sentiment::Neutral,
    };
    Value::String(sentiment.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentDescriptor;
    use crate::clients::ClientError;
    use crate::workflow::StepType;

    struct FixedClassifier(Result<Vec<LabelScore>, ()>);

    #[async_trait]
    impl TextClassifier for FixedClassifier {
        fn model(&self) -> &str {
            "test-model"
        }

        async fn classify(
            &self,
            _text: &str,
            _labels: &[String],
        ) -> Result<Vec<LabelScore>, ClientError> {
            self.0.clone().map_err(|_| ClientError::Status(503))
        }
    }

    fn step() -> ExecutionStep {
        ExecutionStep::new(
            "step_2",
            "process_with_ai",
            "AI processing",
            StepType::AiProcessing,
            true,
        )
    }

    fn labels() -> Vec<String> {
        vec!["positive".into(), "negative".into(), "neutral".into()]
    }

    #[tokio::test]
    async fn test_lexical_without_classifier() {
        let handler = AiProcessingHandler::new(None, labels());
        let agent =
            AgentDescriptor::new("a1", "Agent").with_task("A great launch with excellent feedback");
        let result = handler.run(&step(), &StepContext::new(&agent, &[])).await.unwrap();

        assert!(result.success);
        assert_eq!(result.data["fallback"], true);
        assert_eq!(result.real_data.unwrap()["sentiment"], "positive");
    }

    #[tokio::test]
    async fn test_remote_result_used() {
        let scores = vec![
            LabelScore {
                label: "negative".into(),
                score: 0.7,
            },
            LabelScore {
                label: "positive".into(),
                score: 0.2,
            },
        ];
        let handler =
            AiProcessingHandler::new(Some(Arc::new(FixedClassifier(Ok(scores)))), labels());
        let agent = AgentDescriptor::new("a1", "Agent").with_task("great great great");
        let result = handler.run(&step(), &StepContext::new(&agent, &[])).await.unwrap();

        assert_eq!(result.data["model"], "test-model");
        assert_eq!(result.data["fallback"], false);
        assert_eq!(result.real_data.unwrap()["sentiment"], "negative");
    }

    #[tokio::test]
    async fn test_empty_classification_falls_back() {
        let handler =
            AiProcessingHandler::new(Some(Arc::new(FixedClassifier(Ok(vec![])))), labels());
        let agent = AgentDescriptor::new("a1", "Agent").with_task("A great release");
        let result = handler
            .run(&step(), &StepContext::new(&agent, &[]))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.data["fallback"], true);
        assert_eq!(result.data["model"], LEXICAL_MODEL);
        assert_eq!(result.real_data.unwrap()["sentiment"], "positive");
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back() {
        let handler = AiProcessingHandler::new(Some(Arc::new(FixedClassifier(Err(())))), labels());
        let agent = AgentDescriptor::new("a1", "Agent").with_task("terrible error");
        let result = handler.run(&step(), &StepContext::new(&agent, &[])).await.unwrap();

        assert!(result.success);
        assert_eq!(result.data["model"], LEXICAL_MODEL);
        assert_eq!(result.real_data.unwrap()["sentiment"], "negative");
    }
}
