//! 远程零样本文本分类
//!
//! 调用 Hugging Face Inference API（默认 facebook/bart-large-mnli），
//! 请求体 `{"inputs": text, "parameters": {"candidate_labels": [...]}}`。
//! 响应可能是 `{"labels": [...], "scores": [...]}`，也可能是 `[{"label", "score"}]`，两种都接受。
//! 调用经熔断器保护；未配置 Key 时直接返回 MissingCredentials。

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clients::{audit, ClientError};
use crate::config::ClassifierSection;
use crate::resilience::CircuitBreaker;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

#[async_trait]
pub trait TextClassifier: Send + Sync {
    /// 模型名（写入步骤结果）
    fn model(&self) -> &str;

    /// 返回按分数降序排列的标签
    async fn classify(&self, text: &str, labels: &[String]) -> Result<Vec<LabelScore>, ClientError>;
}

pub struct HuggingFaceClassifier {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    breaker: Arc<CircuitBreaker>,
}

impl HuggingFaceClassifier {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            breaker,
        }
    }

    pub fn from_config(cfg: &ClassifierSection, breaker: Arc<CircuitBreaker>) -> Self {
        Self::new(
            cfg.endpoint.clone(),
            cfg.resolved_api_key(),
            cfg.timeout_secs,
            breaker,
        )
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    async fn request(
        &self,
        key: &str,
        text: &str,
        labels: &[String],
    ) -> Result<Vec<LabelScore>, ClientError> {
        let body = serde_json::json!({
            "inputs": text,
            "parameters": { "candidate_labels": labels },
        });
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ClientError::Status(resp.status().as_u16()));
        }
        let value: Value = resp.json().await?;
        parse_classification(&value)
    }
}

#[async_trait]
impl TextClassifier for HuggingFaceClassifier {
    fn model(&self) -> &str {
        self.endpoint.rsplit("/models/").next().unwrap_or(&self.endpoint)
    }

    async fn classify(
        &self,
        text: &str,
        labels: &[String],
    ) -> Result<Vec<LabelScore>, ClientError> {
        let key = self.api_key.as_deref().ok_or(ClientError::MissingCredentials)?;
        let started = Instant::now();
        let result = self
            .breaker
            .call(|| self.request(key, text, labels))
            .await
            .map_err(ClientError::from);
        audit("classifier", &self.endpoint, result.is_ok(), started);
        result
    }
}

/// 解析两种响应格式，结果按分数降序
pub fn parse_classification(value: &Value) -> Result<Vec<LabelScore>, ClientError> {
    let value = match value {
        Value::Array(items) if items.first().is_some_and(|v| v.get("labels").is_some()) => {
            &items[0]
        }
        other => other,
    };

    let mut scores = if let (Some(labels), Some(scores)) = (
        value.get("labels").and_then(Value::as_array),
        value.get("scores").and_then(Value::as_array),
    ) {
        labels
            .iter()
            .zip(scores)
            .filter_map(|(l, s)| {
                Some(LabelScore {
                    label: l.as_str()?.to_string(),
                    score: s.as_f64()?,
                })
            })
            .collect::<Vec<_>>()
    } else {
        serde_json::from_value::<Vec<LabelScore>>(value.clone())
            .map_err(|e| ClientError::Decode(e.to_string()))?
    };

    if scores.is_empty() {
        return Err(ClientError::Decode("no labels in classification response".to_string()));
    }
    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(scores)
}
