//! 本地分析：词法情感 / 关键词、描述性统计

pub mod sentiment;
pub mod statistics;

pub use sentiment::{analyze as analyze_text, Keyword, LexicalAnalysis, Sentiment};
pub use statistics::{collect_numbers, describe, Summary};
