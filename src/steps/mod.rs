pub mod ai_processing;
pub mod basic;
pub mod data_collection;
pub mod executor;
pub mod processing;
pub mod registry;
pub mod reporting;

pub use ai_processing::AiProcessingHandler;
pub use basic::{AnalysisHandler, CommunicationHandler, GenericHandler};
pub use data_collection::DataCollectionHandler;
pub use executor::StepExecutor;
pub use processing::ProcessingHandler;
pub use registry::{HandlerRegistry, StepContext, StepHandler};
pub use reporting::ReportingHandler;

/// 截断到 max 个字符，超出时追加 "..."
pub(crate) fn preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max).collect::<String>())
    } else {
        text.to_string()
    }
}
