//! 描述性统计
//!
//! 对前序步骤采集到的数值做统计：均值、总体方差、标准差、最值、
//! 样本与其顺序的 Pearson 相关系数（趋势），以及 95% 区间。结果保留两位小数。

use serde::Serialize;
use serde_json::Value;

/// 单次统计最多使用的样本数
pub const MAX_SAMPLES: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub sample_size: usize,
    pub mean: f64,
    pub variance: f64,
    pub std_deviation: f64,
    pub min: f64,
    pub max: f64,
    /// 样本值与样本序号的相关系数；样本不足或无波动时为 0
    pub correlation: f64,
    pub confidence_interval: [f64; 2],
}

pub fn describe(samples: &[f64]) -> Option<Summary> {
    if samples.is_empty() {
        return None;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let std_deviation = variance.sqrt();
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(Summary {
        sample_size: samples.len(),
        mean: round2(mean),
        variance: round2(variance),
        std_deviation: round2(std_deviation),
        min: round2(min),
        max: round2(max),
        correlation: round2(trend_correlation(samples, mean, std_deviation)),
        confidence_interval: [
            round2(mean - 1.96 * std_deviation),
            round2(mean + 1.96 * std_deviation),
        ],
    })
}

fn trend_correlation(samples: &[f64], mean: f64, std_deviation: f64) -> f64 {
    if samples.len() < 2 || std_deviation == 0.0 {
        return 0.0;
    }
    let n = samples.len() as f64;
    let index_mean = (n - 1.0) / 2.0;
    let index_std = ((n * n - 1.0) / 12.0).sqrt();
    let covariance = samples
        .iter()
        .enumerate()
        .map(|(i, x)| (i as f64 - index_mean) * (x - mean))
        .sum::<f64>()
        / n;
    (covariance / (index_std * std_deviation)).clamp(-1.0, 1.0)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// 深度遍历 JSON，按文档中的出现顺序（serde_json 启用 preserve_order）收集有限数值，最多 limit 个
pub fn collect_numbers(value: &Value, limit: usize, out: &mut Vec<f64>) {
    if out.len() >= limit {
        return;
    }
    match value {
        Value::Number(n) => {
            if let Some(x) = n.as_f64().filter(|x| x.is_finite()) {
                out.push(x);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_numbers(item, limit, out);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_numbers(item, limit, out);
            }
        }
        _ => {}
    }
}
