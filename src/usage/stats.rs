//! Statistical primitives over integer samples
//!
//! All functions take a borrowed slice and sort a private copy when ordering
//! is needed, so callers' data is never reordered.

use std::collections::HashMap;

/// Default IQR multiplier for outlier fences
pub const OUTLIER_IQR_MULTIPLIER: f64 = 1.5;

/// Nearest-rank percentile: index `ceil(n * p / 100) - 1`, clamped to `[0, n-1]`.
/// Returns 0 for empty input.
pub fn percentile(values: &[u64], p: f64) -> u64 {
    if values.is_empty() {
        return 0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let n = sorted.len();
    let rank = (n as f64 * p / 100.0).ceil() as i64 - 1;
    let index = rank.clamp(0, n as i64 - 1) as usize;

    sorted[index]
}

/// Arithmetic mean, 0 for empty input
pub fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n). Returns 0 for fewer than two values.
pub fn std_dev(values: &[u64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let avg = mean(values);
    let variance = values
        .iter()
        .map(|&v| {
            let diff = v as f64 - avg;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;

    variance.sqrt()
}

/// Coefficient of variation, `None` when the mean is zero
pub fn coefficient_of_variation(values: &[u64]) -> Option<f64> {
    let avg = mean(values);
    if avg == 0.0 {
        return None;
    }
    Some(std_dev(values) / avg)
}

/// Mean after trimming `trim_percent` of the sorted values from each end.
///
/// At least one value is trimmed from each side once there are more than two
/// samples. Falls back to the upper median when trimming would consume
/// everything.
pub fn trimmed_mean(values: &[u64], trim_percent: f64) -> u64 {
    if values.is_empty() {
        return 0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let n = sorted.len();

    let mut trim_count = (n as f64 * trim_percent / 100.0).floor() as usize;
    if trim_count == 0 && n > 2 {
        trim_count = 1;
    }

    if trim_count * 2 >= n {
        return sorted[n / 2];
    }

    let kept = &sorted[trim_count..n - trim_count];
    kept.iter().sum::<u64>() / kept.len() as u64
}

/// Most frequent value. Ties go to the value seen first in input order.
pub fn mode(values: &[u64]) -> u64 {
    let mut freq: HashMap<u64, usize> = HashMap::new();
    for &v in values {
        *freq.entry(v).or_insert(0) += 1;
    }

    let mut best = 0;
    let mut best_count = 0;
    for &v in values {
        let count = freq[&v];
        if count > best_count {
            best = v;
            best_count = count;
        }
    }

    best
}

/// Drop values outside `[Q1 - 1.5*IQR, Q3 + 1.5*IQR]`, keeping input order.
/// Fewer than four values are returned unchanged.
pub fn remove_outliers(values: &[u64]) -> Vec<u64> {
    remove_outliers_with(values, OUTLIER_IQR_MULTIPLIER)
}

/// IQR trimming with a custom fence multiplier
pub fn remove_outliers_with(values: &[u64], multiplier: f64) -> Vec<u64> {
    if values.len() < 4 {
        return values.to_vec();
    }

    let q1 = percentile(values, 25.0) as f64;
    let q3 = percentile(values, 75.0) as f64;
    let iqr = q3 - q1;

    let lower = q1 - multiplier * iqr;
    let upper = q3 + multiplier * iqr;

    values
        .iter()
        .copied()
        .filter(|&v| {
            let v = v as f64;
            v >= lower && v <= upper
        })
        .collect()
}
