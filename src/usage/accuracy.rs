//! Accuracy analysis of ceiling estimates against observed history

use serde::Serialize;

use crate::usage::estimator::{historical_samples, CeilingEstimator, PerItemMethod};
use crate::usage::models::UsageInterval;
use crate::usage::stats::{percentile, std_dev};

/// How well the estimated ceiling matches the observed session peaks
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyAnalysis {
    pub category: String,
    /// 95th percentile of completed session totals
    pub actual_p95: u64,
    pub estimated_ceiling: u64,
    pub accuracy_percent: f64,
    pub sample_size: usize,
    pub average_per_item: u64,
    pub std_deviation: f64,
}

/// Spread of per-item consumption across completed sessions
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerItemVariance {
    pub min: f64,
    pub max: f64,
    pub average: f64,
    /// `max / min`
    pub range: f64,
}

impl PerItemVariance {
    /// More than a 3x spread makes a static per-item figure unreliable
    pub fn is_high(&self) -> bool {
        self.range > 3.0
    }
}

pub fn analyze_accuracy(
    category: &str,
    intervals: &[UsageInterval],
    estimator: &CeilingEstimator,
) -> AccuracyAnalysis {
    let estimated = estimator.estimate(category, intervals);
    let samples = historical_samples(intervals);

    let (total, items) = intervals
        .iter()
        .filter(|i| i.is_historical() && i.total_consumed > 0)
        .fold((0u64, 0u64), |(t, n), i| (t + i.total_consumed, n + i.item_count));

    let actual_p95 = percentile(&samples, 95.0);
    let accuracy_percent = if actual_p95 > 0 {
        let diff = (estimated as f64 - actual_p95 as f64).abs() / actual_p95 as f64 * 100.0;
        100.0 - diff
    } else {
        100.0
    };

    AccuracyAnalysis {
        category: category.to_string(),
        actual_p95,
        estimated_ceiling: estimated,
        accuracy_percent,
        sample_size: samples.len(),
        average_per_item: if items > 0 { total / items } else { 0 },
        std_deviation: std_dev(&samples),
    }
}

fn per_item_ratios(intervals: &[UsageInterval]) -> Vec<f64> {
    intervals
        .iter()
        .filter(|i| i.is_historical() && i.item_count > 0)
        .map(|i| i.total_consumed as f64 / i.item_count as f64)
        .collect()
}

/// `None` when no completed session has any items
pub fn per_item_variance(intervals: &[UsageInterval]) -> Option<PerItemVariance> {
    let ratios = per_item_ratios(intervals);
    if ratios.is_empty() {
        return None;
    }

    let min = ratios.iter().copied().fold(f64::INFINITY, f64::min);
    let max = ratios.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let average = ratios.iter().sum::<f64>() / ratios.len() as f64;
    let range = if min > 0.0 { max / min } else { f64::INFINITY };

    Some(PerItemVariance {
        min,
        max,
        average,
        range,
    })
}

/// Per-item consumption summarized with `method` over completed sessions
pub fn per_item_by_method(intervals: &[UsageInterval], method: PerItemMethod) -> u64 {
    let completed: Vec<&UsageInterval> = intervals
        .iter()
        .filter(|i| i.is_historical() && i.item_count > 0)
        .collect();

    let values: Vec<u64> = completed
        .iter()
        .map(|i| i.total_consumed / i.item_count)
        .collect();
    let total = completed.iter().map(|i| i.total_consumed).sum();
    let items = completed.iter().map(|i| i.item_count).sum();

    method.apply(&values, total, items)
}
