//! 执行路径选择：先探测委托服务，可用则整体委托，否则回退到本地执行
//!
//! 每次调用最多回退一次，不做重试。

use crate::agent::AgentDescriptor;
use crate::clients::DelegateClient;
use crate::workflow::ExecutionRecord;

#[derive(Debug)]
pub enum ExecutionPath {
    /// 委托服务返回的终态记录，原样采用
    Delegated(ExecutionRecord),
    /// 回退原因（仅用于日志）
    LocalFallback(String),
}

pub async fn select_path(
    delegate: Option<&dyn DelegateClient>,
    agent: &AgentDescriptor,
) -> ExecutionPath {
    let Some(delegate) = delegate else {
        return ExecutionPath::LocalFallback("delegate disabled".to_string());
    };
    if let Err(e) = delegate.health_check().await {
        return ExecutionPath::LocalFallback(format!("delegate unavailable: {e}"));
    }
    match delegate.execute(agent).await {
        Ok(record) => ExecutionPath::Delegated(record),
        Err(e) => ExecutionPath::LocalFallback(format!("delegate execution failed: {e}")),
    }
}
