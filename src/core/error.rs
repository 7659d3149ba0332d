//! 执行错误类型
//!
//! ExecutionError 不会越过 execute_agent：它被写入执行记录的 error 字段，记录状态置为 Failed。

use thiserror::Error;

use crate::workflow::WorkflowError;

#[derive(Error, Debug)]
pub enum ExecutionError {
    /// 关键步骤失败，后续步骤不再执行
    #[error("Critical step '{step}' failed: {error}")]
    CriticalStepFailed { step: String, error: String },

    #[error("Plan setup failed: {0}")]
    PlanSetup(#[from] WorkflowError),
}
