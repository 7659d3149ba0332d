//! 数据采集步骤：顺序抓取固定的 JSON 源
//!
//! 每个源各自记录成功或失败，只要有一个源成功步骤即成功。
//! real_data 为逐源结果列表 `[{source, status, data | error, timestamp}]`。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use crate::clients::JsonFetcher;
use crate::steps::{StepContext, StepHandler};
use crate::workflow::{ExecutionStep, StepResult};

pub struct DataCollectionHandler {
    fetcher: Arc<dyn JsonFetcher>,
    sources: Vec<String>,
}

impl DataCollectionHandler {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, sources: Vec<String>) -> Self {
        Self { fetcher, sources }
    }
}

#[async_trait]
impl StepHandler for DataCollectionHandler {
    async fn run(
        &self,
        step: &ExecutionStep,
        _ctx: &StepContext<'_>,
    ) -> Result<StepResult, String> {
        if self.sources.is_empty() {
            return Err("no data sources configured".to_string());
        }

        let mut per_source = Vec::with_capacity(self.sources.len());
        let mut succeeded = 0usize;
        let mut last_error = String::new();
        for source in &self.sources {
            match self.fetcher.get_json(source).await {
                Ok(data) => {
                    succeeded += 1;
                    per_source.push(json!({
                        "source": source,
                        "status": "success",
                        "data": data,
                        "timestamp": Utc::now(),
                    }));
                }
                Err(e) => {
                    tracing::warn!(
                        step = %step.id,
                        source = %source,
                        error = %e,
                        "source fetch failed"
                    );
                    last_error = e.to_string();
                    per_source.push(json!({
                        "source": source,
                        "status": "failed",
                        "error": e.to_string(),
                        "timestamp": Utc::now(),
                    }));
                }
            }
        }

        let real_data = Value::Array(per_source);
        if succeeded == 0 {
            let mut result = StepResult::failed(format!(
                "all {} sources failed, last error: {last_error}",
                self.sources.len()
            ));
            result.data = json!({ "sources_attempted": self.sources.len() });
            return Ok(result.with_real_data(real_data));
        }

        let data = json!({
            "sources_attempted": self.sources.len(),
            "sources_successful": succeeded,
            "collected_at": Utc::now(),
        });
        Ok(StepResult::ok(
            data,
            format!("Collected data from {succeeded}/{} sources", self.sources.len()),
        )
        .with_real_data(real_data))
    }
}
