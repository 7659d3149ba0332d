//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `AGENTFLOW__*` 覆盖（双下划线表示嵌套，如 `AGENTFLOW__DELEGATE__ENABLED=false`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 占位 Key（示例配置里的默认值），视为未配置
const PLACEHOLDER_API_KEY: &str = "your-huggingface-api-key-here";

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub executor: ExecutorSection,
    pub delegate: DelegateSection,
    pub collection: CollectionSection,
    pub classifier: ClassifierSection,
    pub resilience: ResilienceSection,
    pub queue: QueueSection,
}

/// [executor] 段：执行历史保留条数
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorSection {
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
        }
    }
}

fn default_history_limit() -> usize {
    50
}

/// [delegate] 段：外部委托执行服务
#[derive(Debug, Clone, Deserialize)]
pub struct DelegateSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_delegate_url")]
    pub base_url: String,
    #[serde(default = "default_delegate_timeout")]
    pub timeout_secs: u64,
}

impl Default for DelegateSection {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_delegate_url(),
            timeout_secs: default_delegate_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_delegate_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_delegate_timeout() -> u64 {
    30
}

/// [collection] 段：数据采集源、单次请求超时、响应缓存
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionSection {
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
    #[serde(default = "default_collection_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_entries")]
    pub cache_max_entries: usize,
}

impl Default for CollectionSection {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            timeout_secs: default_collection_timeout(),
            cache_ttl_secs: default_cache_ttl(),
            cache_max_entries: default_cache_entries(),
        }
    }
}

fn default_sources() -> Vec<String> {
    vec![
        "https://api.github.com/repos/microsoft/vscode".into(),
        "https://jsonplaceholder.typicode.com/posts".into(),
    ]
}

fn default_collection_timeout() -> u64 {
    5
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_cache_entries() -> usize {
    1000
}

/// [classifier] 段：远程零样本文本分类（缺少 Key 时走本地词法分析）
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierSection {
    #[serde(default = "default_classifier_endpoint")]
    pub endpoint: String,
    pub api_key: Option<String>,
    #[serde(default = "default_classifier_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            endpoint: default_classifier_endpoint(),
            api_key: None,
            timeout_secs: default_classifier_timeout(),
            labels: default_labels(),
        }
    }
}

impl ClassifierSection {
    /// 有效的 API Key：配置优先，其次环境变量 HUGGINGFACE_API_KEY；空串与占位值视为缺失
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("HUGGINGFACE_API_KEY").ok())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty() && k != PLACEHOLDER_API_KEY)
    }
}

fn default_classifier_endpoint() -> String {
    "https://api-inference.huggingface.co/models/facebook/bart-large-mnli".to_string()
}

fn default_classifier_timeout() -> u64 {
    15
}

fn default_labels() -> Vec<String> {
    ["positive", "negative", "neutral", "urgent", "important", "data", "analysis"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// [resilience] 段：熔断器参数（分类器与委托服务共用）
#[derive(Debug, Clone, Deserialize)]
pub struct ResilienceSection {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_reset_timeout")]
    pub reset_timeout_secs: u64,
    #[serde(default = "default_half_open_successes")]
    pub half_open_successes: u32,
}

impl Default for ResilienceSection {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            reset_timeout_secs: default_reset_timeout(),
            half_open_successes: default_half_open_successes(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_reset_timeout() -> u64 {
    45
}

fn default_half_open_successes() -> u32 {
    3
}

/// [queue] 段：批量执行的并发与重试次数
#[derive(Debug, Clone, Deserialize)]
pub struct QueueSection {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_concurrency() -> usize {
    2
}

fn default_max_attempts() -> u32 {
    3
}

/// 从 config 目录加载配置，环境变量 AGENTFLOW__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 AGENTFLOW__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("AGENTFLOW")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.executor.history_limit, 50);
        assert!(cfg.delegate.enabled);
        assert_eq!(cfg.collection.sources.len(), 2);
        assert_eq!(cfg.collection.timeout_secs, 5);
        assert_eq!(cfg.resilience.half_open_successes, 3);
        assert_eq!(cfg.queue.max_attempts, 3);
    }

    #[test]
    fn test_load_from_file_overrides_section() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            concat!(
                "[delegate]\nenabled = false\nbase_url = \"http://127.0.0.1:9\"\n\n",
                "[executor]\nhistory_limit = 7"
            )
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert!(!cfg.delegate.enabled);
        assert_eq!(cfg.delegate.base_url, "http://127.0.0.1:9");
        assert_eq!(cfg.executor.history_limit, 7);
        // 未出现的段保持默认
        assert_eq!(cfg.collection.cache_max_entries, 1000);
    }

    #[test]
    fn test_placeholder_key_is_missing() {
        let section = ClassifierSection {
            api_key: Some(PLACEHOLDER_API_KEY.to_string()),
            ..ClassifierSection::default()
        };
        assert!(section.resolved_api_key().is_none());

        let section = ClassifierSection {
            api_key: Some("hf_real".to_string()),
            ..ClassifierSection::default()
        };
        assert_eq!(section.resolved_api_key().as_deref(), Some("hf_real"));
    }
}
