//! agentflow - Agent 执行编排
//!
//! 模块划分：
//! - **agent**: Agent 描述（任务文本、技能、可选的外部任务拆解）
//! - **analysis**: 本地词法情感分析与描述性统计
//! - **clients**: 外部协作方（JSON 抓取、远程文本分类、委托执行服务）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 执行编排、记录存储、委托 / 本地路径选择
//! - **observability**: tracing 初始化
//! - **resilience**: 熔断器、LRU + TTL 缓存、优先级任务队列
//! - **steps**: 步骤处理器、注册表与步骤执行器
//! - **workflow**: 计划与记录类型、计划生成、结果汇总

pub mod agent;
pub mod analysis;
pub mod clients;
pub mod config;
pub mod core;
pub mod observability;
pub mod resilience;
pub mod steps;
pub mod workflow;

pub use agent::{AgentDescriptor, PlannedAction};
pub use core::{AgentExecutor, AgentState, AgentStatus};
pub use workflow::{ExecutionRecord, ExecutionStatus};
