//! Hybrid ceiling estimation from session history and plan allowances

use log::debug;

use crate::usage::models::{CeilingEstimate, UsageInterval};
use crate::usage::plans::{Category, PlanCatalog};
use crate::usage::stats::{
    coefficient_of_variation, mode, percentile, remove_outliers_with, trimmed_mean,
    OUTLIER_IQR_MULTIPLIER,
};

/// Confidence weights for the data-driven estimate.
///
/// Rows are checked top to bottom; the first matching row wins.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    /// `(sample count upper bound, exclusive; weight)`
    pub sample_tiers: Vec<(usize, f64)>,
    /// `(coefficient of variation lower bound, exclusive; weight)`
    pub variance_tiers: Vec<(f64, f64)>,
    /// Weight for large, stable histories
    pub stable_weight: f64,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            sample_tiers: vec![(10, 0.3), (20, 0.5)],
            variance_tiers: vec![(0.5, 0.4), (0.3, 0.6)],
            stable_weight: 0.8,
        }
    }
}

impl WeightTable {
    /// Weight for the uncleaned sample set
    pub fn weight(&self, samples: &[u64]) -> f64 {
        let n = samples.len();
        if let Some(&(_, w)) = self.sample_tiers.iter().find(|(bound, _)| n < *bound) {
            return w;
        }

        // Samples are all positive so the mean is too; a zero mean only
        // happens with an empty slice, which the sample tiers already caught.
        let Some(cv) = coefficient_of_variation(samples) else {
            return self.stable_weight;
        };

        self.variance_tiers
            .iter()
            .find(|(bound, _)| cv > *bound)
            .map(|&(_, w)| w)
            .unwrap_or(self.stable_weight)
    }
}

/// Tunables for the estimator
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorPolicy {
    /// Below this many completed sessions only the reference estimate is used
    pub min_historical_sessions: usize,
    /// Minimum sessions that must survive outlier removal
    pub min_cleaned_sessions: usize,
    pub historical_percentile: f64,
    /// Percentile of the raw samples used when too many outliers were removed
    pub fallback_percentile: f64,
    pub outlier_iqr_multiplier: f64,
    /// Sessions considered for the recent per-item average
    pub recent_sessions: usize,
    pub accuracy_warning_percent: f64,
    pub weights: WeightTable,
}

impl Default for EstimatorPolicy {
    fn default() -> Self {
        Self {
            min_historical_sessions: 5,
            min_cleaned_sessions: 3,
            historical_percentile: 90.0,
            fallback_percentile: 85.0,
            outlier_iqr_multiplier: OUTLIER_IQR_MULTIPLIER,
            recent_sessions: 10,
            accuracy_warning_percent: 10.0,
            weights: WeightTable::default(),
        }
    }
}

/// Totals of every completed session with non-zero consumption
pub fn historical_samples(intervals: &[UsageInterval]) -> Vec<u64> {
    intervals
        .iter()
        .filter(|i| i.is_historical() && i.total_consumed > 0)
        .map(|i| i.total_consumed)
        .collect()
}

/// Estimates the consumption ceiling of the current session
#[derive(Debug, Clone, Default)]
pub struct CeilingEstimator {
    catalog: PlanCatalog,
    policy: EstimatorPolicy,
}

impl CeilingEstimator {
    pub fn new(catalog: PlanCatalog, policy: EstimatorPolicy) -> Self {
        Self { catalog, policy }
    }

    /// Ceiling value for a category label
    pub fn estimate(&self, category: &str, intervals: &[UsageInterval]) -> u64 {
        self.estimate_detailed(Category::parse(category), intervals).value
    }

    /// Blend the data-driven estimate with the plan reference
    pub fn estimate_detailed(
        &self,
        category: Category,
        intervals: &[UsageInterval],
    ) -> CeilingEstimate {
        let tier = category.resolve(intervals);
        let profile = self.catalog.profile(tier);

        let per_item = self
            .recent_average_per_item(intervals)
            .filter(|&rate| rate > 0)
            .unwrap_or(profile.default_per_item);
        let reference = profile.reference_ceiling(per_item);

        let samples = historical_samples(intervals);
        let (value, basis) = match self.data_driven_estimate(&samples) {
            Some(data) => {
                let weight = self.policy.weights.weight(&samples);
                let blended = data as f64 * weight + reference as f64 * (1.0 - weight);
                debug!(
                    "Blending data estimate {} with reference {} ({}) at weight {:.1}",
                    data, reference, tier, weight
                );
                (blended.round() as u64, samples.len())
            }
            None => {
                debug!(
                    "Using reference estimate {} for {} ({} sessions of history)",
                    reference,
                    tier,
                    samples.len()
                );
                (reference, 0)
            }
        };

        CeilingEstimate {
            value,
            basis_session_count: basis,
            per_item_rate: per_item,
            source_category: tier.to_string(),
        }
    }

    /// Percentile estimate from session history, `None` with too few sessions
    pub fn data_driven_estimate(&self, samples: &[u64]) -> Option<u64> {
        if samples.len() < self.policy.min_historical_sessions {
            return None;
        }

        let cleaned = remove_outliers_with(samples, self.policy.outlier_iqr_multiplier);
        if cleaned.len() < self.policy.min_cleaned_sessions {
            debug!(
                "Only {} of {} sessions survived outlier removal",
                cleaned.len(),
                samples.len()
            );
            return Some(percentile(samples, self.policy.fallback_percentile));
        }

        Some(percentile(&cleaned, self.policy.historical_percentile))
    }

    /// Confidence in the data-driven estimate for this history
    pub fn confidence_weight(&self, intervals: &[UsageInterval]) -> f64 {
        self.policy.weights.weight(&historical_samples(intervals))
    }

    /// Consumption per item over the most recent completed sessions.
    ///
    /// Active and gap intervals never count, nor do sessions without items.
    pub fn recent_average_per_item(&self, intervals: &[UsageInterval]) -> Option<u64> {
        let (total, items) = intervals
            .iter()
            .rev()
            .filter(|i| i.is_historical() && i.item_count > 0)
            .take(self.policy.recent_sessions)
            .fold((0u64, 0u64), |(total, items), i| {
                (total + i.total_consumed, items + i.item_count)
            });

        if items == 0 {
            return None;
        }
        Some(total / items)
    }

    /// Warn when the observed usage deviates from the estimate by more than the threshold
    pub fn accuracy_warning(&self, actual: u64, estimated: u64) -> Option<String> {
        accuracy_warning(actual, estimated, self.policy.accuracy_warning_percent)
    }
}

/// Deviation message when `|actual - estimated| / estimated` exceeds `threshold_percent`
pub fn accuracy_warning(actual: u64, estimated: u64, threshold_percent: f64) -> Option<String> {
    if estimated == 0 {
        return None;
    }

    let deviation = (actual as f64 - estimated as f64) / estimated as f64 * 100.0;
    if deviation.abs() > threshold_percent {
        return Some(format!(
            "Warning: ceiling estimate may be inaccurate (deviation: {:+.1}%)",
            deviation
        ));
    }

    None
}

/// How to summarize per-item consumption
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PerItemMethod {
    Median,
    Mode,
    Average,
    Percentile(f64),
    TrimmedMean(f64),
}

impl Default for PerItemMethod {
    fn default() -> Self {
        PerItemMethod::Percentile(40.0)
    }
}

impl PerItemMethod {
    /// Parse `median`, `mode`, `avg`, `pNN` or `trimNN`; anything else is the 40th percentile
    pub fn parse(text: &str) -> Self {
        Self::try_parse(text).unwrap_or_default()
    }

    /// Strict variant of [`PerItemMethod::parse`]
    pub fn try_parse(text: &str) -> Option<Self> {
        let text = text.trim().to_lowercase();
        match text.as_str() {
            "median" => return Some(PerItemMethod::Median),
            "mode" => return Some(PerItemMethod::Mode),
            "avg" | "average" => return Some(PerItemMethod::Average),
            _ => {}
        }

        if let Some(p) = text.strip_prefix("trim").and_then(|s| s.parse::<f64>().ok()) {
            return (0.0..50.0).contains(&p).then_some(PerItemMethod::TrimmedMean(p));
        }
        text.strip_prefix('p')
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|p| (0.0..=100.0).contains(p))
            .map(PerItemMethod::Percentile)
    }

    pub fn label(&self) -> String {
        match self {
            PerItemMethod::Median => "median".to_string(),
            PerItemMethod::Mode => "mode".to_string(),
            PerItemMethod::Average => "average".to_string(),
            PerItemMethod::Percentile(p) if *p == 50.0 => "median".to_string(),
            PerItemMethod::Percentile(p) => format!("{:.0}th percentile", p),
            PerItemMethod::TrimmedMean(t) => format!("{:.0}% trimmed mean", t),
        }
    }

    /// Summarize per-item values; `Average` uses the pooled totals instead
    pub fn apply(&self, per_item_values: &[u64], total: u64, items: u64) -> u64 {
        match self {
            PerItemMethod::Median => percentile(per_item_values, 50.0),
            PerItemMethod::Mode => mode(per_item_values),
            PerItemMethod::Average => {
                if items == 0 {
                    0
                } else {
                    total / items
                }
            }
            PerItemMethod::Percentile(p) => percentile(per_item_values, *p),
            PerItemMethod::TrimmedMean(t) => trimmed_mean(per_item_values, *t),
        }
    }
}
