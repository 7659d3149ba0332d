//! 步骤处理器注册表
//!
//! 每种 StepType 恰好对应一个槽位，handler_for 通过穷举 match 取处理器，
//! 新增步骤类型时编译器会要求补齐。测试可用 with_handler 替换任一槽位。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::agent::AgentDescriptor;
use crate::clients::{JsonFetcher, TextClassifier};
use crate::steps::{
    AiProcessingHandler, AnalysisHandler, CommunicationHandler, DataCollectionHandler,
    GenericHandler, ProcessingHandler, ReportingHandler,
};
use crate::workflow::{ExecutionStep, StepResult, StepType};

/// 处理器可见的只读上下文：所属 Agent 与前序步骤产出的原始数据（按步骤顺序）
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub agent: &'a AgentDescriptor,
    pub prior_real_data: &'a [Value],
}

impl<'a> StepContext<'a> {
    pub fn new(agent: &'a AgentDescriptor, prior_real_data: &'a [Value]) -> Self {
        Self {
            agent,
            prior_real_data,
        }
    }
}

/// 步骤处理器：相互独立，无共享可变状态；Err 与 panic 由执行器转为失败结果
#[async_trait]
pub trait StepHandler: Send + Sync {
    async fn run(&self, step: &ExecutionStep, ctx: &StepContext<'_>) -> Result<StepResult, String>;
}

pub struct HandlerRegistry {
    analysis: Arc<dyn StepHandler>,
    data_collection: Arc<dyn StepHandler>,
    ai_processing: Arc<dyn StepHandler>,
    processing: Arc<dyn StepHandler>,
    communication: Arc<dyn StepHandler>,
    reporting: Arc<dyn StepHandler>,
    generic: Arc<dyn StepHandler>,
}

impl HandlerRegistry {
    /// 默认处理器集合：采集用 fetcher 抓取 sources，AI 处理优先用 classifier（None 时只走词法分析）
    pub fn new(
        fetcher: Arc<dyn JsonFetcher>,
        sources: Vec<String>,
        classifier: Option<Arc<dyn TextClassifier>>,
        labels: Vec<String>,
    ) -> Self {
        Self {
            analysis: Arc::new(AnalysisHandler),
            data_collection: Arc::new(DataCollectionHandler::new(fetcher, sources)),
            ai_processing: Arc::new(AiProcessingHandler::new(classifier, labels)),
            processing: Arc::new(ProcessingHandler),
            communication: Arc::new(CommunicationHandler),
            reporting: Arc::new(ReportingHandler),
            generic: Arc::new(GenericHandler),
        }
    }

    pub fn with_handler(mut self, step_type: StepType, handler: Arc<dyn StepHandler>) -> Self {
        *self.slot_mut(step_type) = handler;
        self
    }

    pub fn handler_for(&self, step_type: StepType) -> &Arc<dyn StepHandler> {
        match step_type {
            StepType::Analysis => &self.analysis,
            StepType::DataCollection => &self.data_collection,
            StepType::AiProcessing => &self.ai_processing,
            StepType::Processing => &self.processing,
            StepType::Communication => &self.communication,
            StepType::Reporting => &self.reporting,
            StepType::Generic => &self.generic,
        }
    }

    fn slot_mut(&mut self, step_type: StepType) -> &mut Arc<dyn StepHandler> {
        match step_type {
            StepType::Analysis => &mut self.analysis,
            StepType::DataCollection => &mut self.data_collection,
            StepType::AiProcessing => &mut self.ai_processing,
            StepType::Processing => &mut self.processing,
            StepType::Communication => &mut self.communication,
            StepType::Reporting => &mut self.reporting,
            StepType::Generic => &mut self.generic,
        }
    }
}
