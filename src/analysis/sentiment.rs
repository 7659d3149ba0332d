//! 词法情感分析（远程分类不可用时的确定性回退）
//!
//! 小写分词后对照固定的正 / 负面词表计数：
//! - 正面多于负面 → positive，反之 negative，相等 → neutral；
//! - 置信度 = 0.6 + 0.1 × 命中数，上限 0.95；neutral 固定 0.6；
//! - 关键词：长度大于 4 的词按频次取前 5，同频次保持首次出现顺序。

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const BASE_CONFIDENCE: f64 = 0.6;
pub const CONFIDENCE_STEP: f64 = 0.1;
pub const MAX_CONFIDENCE: f64 = 0.95;
pub const KEYWORD_MIN_LEN: usize = 5;
pub const TOP_KEYWORDS: usize = 5;

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "amazing", "wonderful", "fantastic", "positive", "success", "win",
];
const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "horrible", "negative", "fail", "error", "problem", "issue",
];

static WORD_RE: OnceLock<Regex> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub word: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexicalAnalysis {
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub word_count: usize,
    pub keywords: Vec<Keyword>,
    pub positive_indicators: usize,
    pub negative_indicators: usize,
}

/// 小写并切分为词（字母数字与撇号）
pub fn tokenize(text: &str) -> Vec<String> {
    let re = WORD_RE.get_or_init(|| Regex::new(r"[\p{L}\p{N}']+").unwrap());
    let lower = text.to_lowercase();
    re.find_iter(&lower)
        .map(|m| m.as_str().trim_matches('\'').to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

pub fn analyze(text: &str) -> LexicalAnalysis {
    let words = tokenize(text);
    let positive = words.iter().filter(|w| POSITIVE_WORDS.contains(&w.as_str())).count();
    let negative = words.iter().filter(|w| NEGATIVE_WORDS.contains(&w.as_str())).count();

    let (sentiment, confidence) = if positive > negative {
        (Sentiment::Positive, confidence_for(positive))
    } else if negative > positive {
        (Sentiment::Negative, confidence_for(negative))
    } else {
        (Sentiment::Neutral, BASE_CONFIDENCE)
    };

    LexicalAnalysis {
        sentiment,
        confidence,
        word_count: words.len(),
        keywords: top_keywords(&words, TOP_KEYWORDS),
        positive_indicators: positive,
        negative_indicators: negative,
    }
}

fn confidence_for(matches: usize) -> f64 {
    (BASE_CONFIDENCE + matches as f64 * CONFIDENCE_STEP).min(MAX_CONFIDENCE)
}

/// 按频次降序取前 n 个关键词；同频次按首次出现顺序
pub fn top_keywords(words: &[String], n: usize) -> Vec<Keyword> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in words.iter().filter(|w| w.chars().count() >= KEYWORD_MIN_LEN) {
        let entry = counts.entry(word.as_str()).or_insert(0);
        if *entry == 0 {
            order.push(word.as_str());
        }
        *entry += 1;
    }

    // sort_by 为稳定排序，保留首次出现顺序
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order
        .into_iter()
        .take(n)
        .map(|word| Keyword {
            word: word.to_string(),
            count: counts[word],
        })
        .collect()
}
