//! 外部协作方抽象与 HTTP 实现
//!
//! - **fetch**: JSON GET（带超时与响应缓存），供数据采集步骤使用
//! - **classifier**: 远程零样本文本分类（Hugging Face Inference API）
//! - **delegate**: 外部委托执行服务（健康探测 + 整体执行）
//!
//! 每个协作方都是 trait，测试中可替换为内存实现。

pub mod classifier;
pub mod delegate;
pub mod fetch;

pub use classifier::{HuggingFaceClassifier, LabelScore, TextClassifier};
pub use delegate::{DelegateClient, HttpDelegate};
pub use fetch::{HttpFetcher, JsonFetcher};

use std::time::Instant;

use thiserror::Error;

use crate::resilience::BreakerError;

/// HTTP 协作方错误
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Missing credentials")]
    MissingCredentials,

    #[error("Service rejected request: {0}")]
    Rejected(String),

    #[error("Circuit open: {0}")]
    CircuitOpen(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout(e.to_string())
        } else if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ClientError::Status(status.as_u16())
        } else {
            ClientError::Request(e.to_string())
        }
    }
}

impl From<BreakerError<ClientError>> for ClientError {
    fn from(e: BreakerError<ClientError>) -> Self {
        match e {
            BreakerError::Open(name) => ClientError::CircuitOpen(name),
            BreakerError::Inner(inner) => inner,
        }
    }
}

/// 每次外部调用输出一行结构化审计日志（JSON）
pub(crate) fn audit(target: &str, url: &str, ok: bool, started: Instant) {
    let audit = serde_json::json!({
        "event": "http_audit",
        "target": target,
        "url": url,
        "ok": ok,
        "duration_ms": started.elapsed().as_millis() as u64,
    });
    tracing::info!(audit = %audit.to_string(), "http");
}
