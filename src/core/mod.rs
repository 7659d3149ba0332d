//! 核心编排层：执行错误、记录存储、路径选择、主控流程

pub mod error;
pub mod fallback;
pub mod orchestrator;
pub mod store;

pub use error::ExecutionError;
pub use fallback::{select_path, ExecutionPath};
pub use orchestrator::{AgentExecutor, AgentState, AgentStatus};
pub use store::{ExecutionStore, InMemoryExecutionStore};
