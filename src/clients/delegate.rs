//! 外部委托执行服务
//!
//! 协议：`GET {base}/health` 探测可用性；`POST {base}/api/agents/execute`，
//! 请求体 `{"agent": ...}`，响应 `{"success": bool, "execution": ExecutionRecord}`。
//! success=false、缺少 execution 或记录仍在运行都视为服务不可用。

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::agent::AgentDescriptor;
use crate::clients::{audit, ClientError};
use crate::config::DelegateSection;
use crate::resilience::CircuitBreaker;
use crate::workflow::ExecutionRecord;

#[async_trait]
pub trait DelegateClient: Send + Sync {
    /// 健康探测
    async fn health_check(&self) -> Result<(), ClientError>;

    /// 由委托服务完成整个计划与执行
    async fn execute(&self, agent: &AgentDescriptor) -> Result<ExecutionRecord, ClientError>;
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    execution: Option<ExecutionRecord>,
    #[serde(default)]
    error: Option<String>,
}

pub struct HttpDelegate {
    client: Client,
    base_url: String,
    breaker: Arc<CircuitBreaker>,
}

impl HttpDelegate {
    pub fn new(
        base_url: impl Into<String>,
        timeout_secs: u64,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            breaker,
        }
    }

    pub fn from_config(cfg: &DelegateSection, breaker: Arc<CircuitBreaker>) -> Self {
        Self::new(cfg.base_url.clone(), cfg.timeout_secs, breaker)
    }

    async fn get_health(&self, url: &str) -> Result<(), ClientError> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::Status(resp.status().as_u16()));
        }
        Ok(())
    }

    async fn post_execute(
        &self,
        url: &str,
        agent: &AgentDescriptor,
    ) -> Result<ExecutionRecord, ClientError> {
        let resp = self
            .client
            .post(url)
            .json(&serde_json::json!({ "agent": agent }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ClientError::Status(resp.status().as_u16()));
        }
        let body: ExecuteResponse = resp.json().await?;
        accept_response(body)
    }
}

fn accept_response(body: ExecuteResponse) -> Result<ExecutionRecord, ClientError> {
    if !body.success {
        return Err(ClientError::Rejected(
            body.error.unwrap_or_else(|| "success=false".to_string()),
        ));
    }
    let record = body
        .execution
        .ok_or_else(|| ClientError::Decode("response has no execution record".to_string()))?;
    if !record.is_finished() {
        return Err(ClientError::Decode("execution record is not terminal".to_string()));
    }
    Ok(record)
}

#[async_trait]
impl DelegateClient for HttpDelegate {
    async fn health_check(&self) -> Result<(), ClientError> {
        let url = format!("{}/health", self.base_url);
        let started = Instant::now();
        let result = self
            .breaker
            .call(|| self.get_health(&url))
            .await
            .map_err(ClientError::from);
        audit("delegate.health", &url, result.is_ok(), started);
        result
    }

    async fn execute(&self, agent: &AgentDescriptor) -> Result<ExecutionRecord, ClientError> {
        let url = format!("{}/api/agents/execute", self.base_url);
        let started = Instant::now();
        let result = self
            .breaker
            .call(|| self.post_execute(&url, agent))
            .await
            .map_err(ClientError::from);
        audit("delegate.execute", &url, result.is_ok(), started);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> ExecuteResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_accepts_completed_record() {
        let body = response(
            r#"{"success": true, "execution": {
                "id": "exec_1", "agentId": "a1", "status": "completed",
                "startTime": "2024-01-01T00:00:00Z", "steps": []
            }}"#,
        );
        let record = accept_response(body).unwrap();
        assert_eq!(record.agent_id, "a1");
    }

    #[test]
    fn test_rejects_unsuccessful_or_missing() {
        assert!(matches!(
            accept_response(response(r#"{"success": false, "error": "Agent data is required"}"#)),
            Err(ClientError::Rejected(msg)) if msg.contains("required")
        ));
        assert!(matches!(
            accept_response(response(r#"{"success": true}"#)),
            Err(ClientError::Decode(_))
        ));
        assert!(matches!(
            accept_response(response(
                r#"{"success": true, "execution": {
                    "id": "exec_1", "agentId": "a1", "status": "running",
                    "startTime": "2024-01-01T00:00:00Z"
                }}"#
            )),
            Err(ClientError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_health_check_fails() {
        let breaker = Arc::new(CircuitBreaker::new("delegate", 3, Duration::from_secs(60), 3));
        // 端口 9（discard）通常无人监听
        let delegate = HttpDelegate::new("http://127.0.0.1:9/", 1, breaker);
        assert!(delegate.health_check().await.is_err());
    }
}
