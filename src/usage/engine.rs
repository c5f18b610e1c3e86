//! Single entry point for the estimation and rate analytics core

use chrono::{DateTime, Utc};
use log::info;

use crate::usage::burnrate::RateCalculator;
use crate::usage::estimator::{CeilingEstimator, EstimatorPolicy};
use crate::usage::models::{CeilingEstimate, SessionSnapshot, UsageInterval};
use crate::usage::plans::{Category, PlanCatalog, PlanTier};
use crate::usage::session::SessionAnalyzer;

/// Ceiling resolved for the current session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCeiling {
    pub estimate: CeilingEstimate,
    /// Set when a pro session outgrew its ceiling and auto-detection raised it
    pub auto_switched: bool,
}

/// Immutable analytics engine, built once and shared by reference
#[derive(Debug, Clone, Default)]
pub struct UsageEngine {
    estimator: CeilingEstimator,
    calculator: RateCalculator,
    analyzer: SessionAnalyzer,
}

impl UsageEngine {
    pub fn new(
        estimator: CeilingEstimator,
        calculator: RateCalculator,
        analyzer: SessionAnalyzer,
    ) -> Self {
        Self {
            estimator,
            calculator,
            analyzer,
        }
    }

    /// Default components with a custom estimator policy
    pub fn with_policy(policy: EstimatorPolicy) -> Self {
        Self::new(
            CeilingEstimator::new(PlanCatalog::new(), policy),
            RateCalculator::new(),
            SessionAnalyzer::new(),
        )
    }

    pub fn estimate_ceiling(&self, category: &str, intervals: &[UsageInterval]) -> u64 {
        self.estimator.estimate(category, intervals)
    }

    pub fn compute_rate(&self, intervals: &[UsageInterval], now: DateTime<Utc>) -> f64 {
        self.calculator.rate(intervals, now)
    }

    pub fn analyze(
        &self,
        current: &UsageInterval,
        all: &[UsageInterval],
        ceiling: u64,
        rate: f64,
        now: DateTime<Utc>,
    ) -> SessionSnapshot {
        self.analyzer.analyze(current, all, ceiling, rate, now)
    }

    /// Concrete tier label for a category, detecting "auto" from history
    pub fn resolve_category(&self, category: &str, intervals: &[UsageInterval]) -> &'static str {
        Category::parse(category).resolve(intervals).as_str()
    }

    pub fn accuracy_warning(&self, actual: u64, estimated: u64) -> Option<String> {
        self.estimator.accuracy_warning(actual, estimated)
    }

    /// Estimate the ceiling for the current session.
    ///
    /// With `auto_switch`, a pro session that already exceeds its estimate is
    /// re-estimated with tier detection and keeps the larger of the two.
    pub fn session_ceiling(
        &self,
        category: &str,
        current: &UsageInterval,
        intervals: &[UsageInterval],
        auto_switch: bool,
    ) -> SessionCeiling {
        let requested = Category::parse(category);
        let estimate = self.estimator.estimate_detailed(requested, intervals);

        let outgrown = current.total_consumed > estimate.value;
        if auto_switch && outgrown && requested == Category::Tier(PlanTier::Pro) {
            let detected = self.estimator.estimate_detailed(Category::Auto, intervals);
            if detected.value > estimate.value {
                info!(
                    "Auto-switched ceiling from {} to {} ({})",
                    estimate.value, detected.value, detected.source_category
                );
                return SessionCeiling {
                    estimate: detected,
                    auto_switched: true,
                };
            }
        }

        SessionCeiling {
            estimate,
            auto_switched: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::models::SessionStatus;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn history(totals: &[u64]) -> Vec<UsageInterval> {
        totals
            .iter()
            .enumerate()
            .map(|(i, &total)| {
                let start = now() - Duration::hours(6 * (totals.len() - i) as i64);
                UsageInterval::completed(start, start + Duration::hours(3), total, total / 150)
            })
            .collect()
    }

    #[test]
    fn test_estimate_fed_back_as_ceiling_never_exceeds() {
        let engine = UsageEngine::default();
        let mut intervals = history(&[6000, 6400, 7000, 6900, 7100, 6600]);
        let ceiling = engine.estimate_ceiling("pro", &intervals);

        let current = UsageInterval::active(now() - Duration::minutes(30), ceiling, 40);
        intervals.push(current.clone());

        let rate = engine.compute_rate(&intervals, now());
        let snap = engine.analyze(&current, &intervals, ceiling, rate, now());

        assert!((snap.percent_used - 100.0).abs() < 1e-9);
        assert_ne!(snap.status, SessionStatus::LimitExceeded);
        assert_eq!(snap.historical_sessions, 6);
    }

    #[test]
    fn test_resolve_category() {
        let engine = UsageEngine::default();
        assert_eq!(engine.resolve_category("auto", &history(&[150_000])), "max20");
        assert_eq!(engine.resolve_category("auto", &history(&[30_000])), "max5");
        assert_eq!(engine.resolve_category("auto", &[]), "pro");
        assert_eq!(engine.resolve_category("max5", &[]), "max5");
        assert_eq!(engine.resolve_category("bogus", &[]), "pro");
    }

    #[test]
    fn test_accuracy_warning_passthrough() {
        let engine = UsageEngine::default();
        assert!(engine.accuracy_warning(8000, 7000).is_some());
        assert!(engine.accuracy_warning(7200, 7000).is_none());
    }

    #[test]
    fn test_with_policy_threshold() {
        let engine = UsageEngine::with_policy(EstimatorPolicy {
            accuracy_warning_percent: 20.0,
            ..EstimatorPolicy::default()
        });
        assert!(engine.accuracy_warning(8000, 7000).is_none());
        assert!(engine.accuracy_warning(9000, 7000).is_some());
    }

    #[test]
    fn test_pro_session_auto_switches_when_outgrown() {
        let engine = UsageEngine::default();
        let intervals = history(&[40_000]);
        let current = UsageInterval::active(now(), 12_000, 80);

        let ceiling = engine.session_ceiling("pro", &current, &intervals, true);
        assert!(ceiling.auto_switched);
        assert_eq!(ceiling.estimate.source_category, "max5");
        assert!(ceiling.estimate.value > 12_000);

        let pinned = engine.session_ceiling("pro", &current, &intervals, false);
        assert!(!pinned.auto_switched);
        assert_eq!(pinned.estimate.source_category, "pro");
    }

    #[test]
    fn test_no_auto_switch_within_ceiling() {
        let engine = UsageEngine::default();
        let intervals = history(&[40_000]);
        let current = UsageInterval::active(now(), 1_000, 10);
        let ceiling = engine.session_ceiling("pro", &current, &intervals, true);
        assert!(!ceiling.auto_switched);
    }
}
