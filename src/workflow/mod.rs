//! 执行计划：类型定义、计划生成、结果汇总

pub mod compiler;
pub mod planner;
pub mod types;

pub use compiler::compile_results;
pub use planner::{infer_step_type, PlanBuilder};
pub use types::*;

use thiserror::Error;

/// 计划构建错误
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Task breakdown contains no actions")]
    EmptyPlan,
    #[error("Invalid plan configuration: {0}")]
    InvalidConfiguration(String),
}
