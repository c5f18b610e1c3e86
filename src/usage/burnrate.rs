//! Burn rate over a trailing window using proportional interval allocation

use chrono::{DateTime, Duration, Utc};

use crate::usage::models::UsageInterval;

/// Default trailing window for burn rate calculation
pub const BURN_RATE_WINDOW_MINUTES: i64 = 60;

fn minutes(delta: Duration) -> f64 {
    delta.num_milliseconds() as f64 / 60_000.0
}

/// Computes consumption per minute over a trailing window
#[derive(Debug, Clone)]
pub struct RateCalculator {
    window: Duration,
}

impl Default for RateCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl RateCalculator {
    /// Calculator with a one hour window
    pub fn new() -> Self {
        Self::with_window(Duration::minutes(BURN_RATE_WINDOW_MINUTES))
    }

    pub fn with_window(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Units per minute consumed within `[now - window, now]`.
    ///
    /// Each interval's total is assumed to be spread evenly across its own
    /// duration, so only the overlapping fraction counts.
    pub fn rate(&self, intervals: &[UsageInterval], now: DateTime<Utc>) -> f64 {
        let window_minutes = minutes(self.window);
        if window_minutes <= 0.0 {
            return 0.0;
        }

        let window_start = now - self.window;
        let consumed: f64 = intervals
            .iter()
            .filter(|i| !i.is_gap)
            .map(|i| Self::consumed_in_window(i, window_start, now))
            .sum();

        consumed / window_minutes
    }

    /// Portion of an interval's consumption that falls inside the window
    fn consumed_in_window(
        interval: &UsageInterval,
        window_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> f64 {
        let end = Self::effective_end(interval, now);

        let overlap_start = interval.start_time.max(window_start);
        let overlap_end = end.min(now);
        if overlap_end <= overlap_start {
            return 0.0;
        }

        let total_minutes = minutes(end - interval.start_time);
        if total_minutes <= 0.0 {
            return 0.0;
        }

        let overlap_minutes = minutes(overlap_end - overlap_start);
        interval.total_consumed as f64 * (overlap_minutes / total_minutes)
    }

    /// Open intervals run until now; closed ones until their recorded end
    fn effective_end(interval: &UsageInterval, now: DateTime<Utc>) -> DateTime<Utc> {
        if interval.is_active {
            return now;
        }
        interval.end_time.unwrap_or(now)
    }
}
