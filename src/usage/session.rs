//! Session metrics: progress, status and depletion projection

use chrono::{DateTime, Duration, Utc};

use crate::usage::models::{SessionSnapshot, SessionStatus, UsageInterval};

/// Session window length in minutes (5 hours)
pub const SESSION_DURATION_MINUTES: f64 = 300.0;

/// Derives displayable metrics for the current session
#[derive(Debug, Clone)]
pub struct SessionAnalyzer {
    session_duration: Duration,
}

impl Default for SessionAnalyzer {
    fn default() -> Self {
        Self {
            session_duration: Duration::minutes(SESSION_DURATION_MINUTES as i64),
        }
    }
}

impl SessionAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed expiry of a session starting at `start`
    pub fn session_end(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start + self.session_duration
    }

    pub fn analyze(
        &self,
        current: &UsageInterval,
        all: &[UsageInterval],
        ceiling: u64,
        rate: f64,
        now: DateTime<Utc>,
    ) -> SessionSnapshot {
        let consumed = current.total_consumed;
        let remaining = ceiling as i64 - consumed as i64;
        let percent_used = if ceiling > 0 {
            consumed as f64 / ceiling as f64 * 100.0
        } else {
            0.0
        };

        let session_end = self.session_end(current.start_time);
        let duration_minutes = self.session_duration.num_seconds() as f64 / 60.0;
        let elapsed_minutes = (now - current.start_time).num_milliseconds() as f64 / 60_000.0;
        let remaining_minutes =
            ((session_end - now).num_milliseconds() as f64 / 60_000.0).max(0.0);
        let progress_percent = (elapsed_minutes / duration_minutes * 100.0).clamp(0.0, 100.0);

        let projected = projected_depletion(remaining, rate, now, session_end);
        let status = classify(consumed, ceiling, projected, session_end);

        SessionSnapshot {
            consumed_so_far: consumed,
            ceiling,
            percent_used,
            remaining,
            elapsed_minutes,
            remaining_minutes,
            progress_percent,
            burn_rate: rate,
            session_end_time: session_end,
            projected_depletion_time: projected,
            status,
            historical_sessions: all.iter().filter(|i| i.is_historical()).count(),
        }
    }
}

/// When the ceiling will be hit at the current rate, or the session end if never
pub fn projected_depletion(
    remaining: i64,
    rate: f64,
    now: DateTime<Utc>,
    session_end: DateTime<Utc>,
) -> DateTime<Utc> {
    if rate <= 0.0 || remaining <= 0 {
        return session_end;
    }

    let millis = remaining as f64 / rate * 60_000.0;
    if !millis.is_finite() || millis >= i64::MAX as f64 {
        return session_end;
    }

    Duration::try_milliseconds(millis as i64)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(session_end)
}

/// Exceeding the ceiling dominates; otherwise warn when depletion comes before expiry
pub fn classify(
    consumed: u64,
    ceiling: u64,
    projected: DateTime<Utc>,
    session_end: DateTime<Utc>,
) -> SessionStatus {
    if consumed > ceiling {
        SessionStatus::LimitExceeded
    } else if projected < session_end {
        SessionStatus::Warning
    } else {
        SessionStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
    }

    fn current(consumed: u64) -> UsageInterval {
        UsageInterval::active(start(), consumed, 20)
    }

    #[test]
    fn test_time_progress() {
        let analyzer = SessionAnalyzer::new();
        let now = start() + Duration::minutes(90);
        let snap = analyzer.analyze(&current(1000), &[], 7000, 0.0, now);

        assert!((snap.elapsed_minutes - 90.0).abs() < 1e-9);
        assert!((snap.remaining_minutes - 210.0).abs() < 1e-9);
        assert!((snap.progress_percent - 30.0).abs() < 1e-9);
        assert_eq!(snap.session_end_time, start() + Duration::hours(5));
    }

    #[test]
    fn test_progress_is_clamped() {
        let analyzer = SessionAnalyzer::new();
        let late = analyzer.analyze(&current(0), &[], 7000, 0.0, start() + Duration::hours(7));
        assert_eq!(late.progress_percent, 100.0);
        assert_eq!(late.remaining_minutes, 0.0);

        let early = analyzer.analyze(&current(0), &[], 7000, 0.0, start() - Duration::minutes(5));
        assert_eq!(early.progress_percent, 0.0);
    }

    #[test]
    fn test_limit_exceeded_dominates() {
        let analyzer = SessionAnalyzer::new();
        let now = start() + Duration::minutes(10);
        let idle = analyzer.analyze(&current(7001), &[], 7000, 0.0, now);
        assert_eq!(idle.status, SessionStatus::LimitExceeded);
        assert_eq!(idle.remaining, -1);

        let busy = analyzer.analyze(&current(9000), &[], 7000, 500.0, now);
        assert_eq!(busy.status, SessionStatus::LimitExceeded);
    }

    #[test]
    fn test_warning_when_depletion_precedes_expiry() {
        let analyzer = SessionAnalyzer::new();
        let now = start() + Duration::minutes(60);
        // 4000 remaining at 100/min runs out in 40 minutes
        let snap = analyzer.analyze(&current(3000), &[], 7000, 100.0, now);
        assert_eq!(snap.status, SessionStatus::Warning);
        assert_eq!(snap.projected_depletion_time, now + Duration::minutes(40));
    }

    #[test]
    fn test_ok_when_depletion_after_expiry() {
        let analyzer = SessionAnalyzer::new();
        let now = start() + Duration::minutes(60);
        // 4000 remaining at 10/min lasts 400 minutes, beyond the 240 left
        let snap = analyzer.analyze(&current(3000), &[], 7000, 10.0, now);
        assert_eq!(snap.status, SessionStatus::Ok);
        assert!(snap.projected_depletion_time > snap.session_end_time);
    }

    #[test]
    fn test_no_rate_projects_session_end() {
        let analyzer = SessionAnalyzer::new();
        let now = start() + Duration::minutes(60);
        let snap = analyzer.analyze(&current(3000), &[], 7000, 0.0, now);
        assert_eq!(snap.projected_depletion_time, snap.session_end_time);
        assert_eq!(snap.status, SessionStatus::Ok);
    }

    #[test]
    fn test_exactly_at_ceiling_is_not_exceeded() {
        let analyzer = SessionAnalyzer::new();
        let now = start() + Duration::minutes(60);
        let snap = analyzer.analyze(&current(7000), &[], 7000, 250.0, now);
        assert!((snap.percent_used - 100.0).abs() < 1e-9);
        assert_eq!(snap.remaining, 0);
        assert_ne!(snap.status, SessionStatus::LimitExceeded);
    }

    #[test]
    fn test_zero_ceiling_guards_percentage() {
        let analyzer = SessionAnalyzer::new();
        let snap = analyzer.analyze(&current(0), &[], 0, 0.0, start());
        assert_eq!(snap.percent_used, 0.0);
        assert_eq!(snap.status, SessionStatus::Ok);
    }

    #[test]
    fn test_tiny_rate_does_not_overflow() {
        let now = start() + Duration::minutes(1);
        let end = start() + Duration::hours(5);
        assert_eq!(projected_depletion(i64::MAX, f64::MIN_POSITIVE, now, end), end);
    }

    #[test]
    fn test_counts_historical_sessions() {
        let analyzer = SessionAnalyzer::new();
        let earlier = start() - Duration::hours(8);
        let all = vec![
            UsageInterval::completed(earlier, earlier + Duration::hours(1), 500, 5),
            UsageInterval::gap(earlier + Duration::hours(1), start()),
            current(100),
        ];
        let snap = analyzer.analyze(&all[2], &all, 7000, 0.0, start());
        assert_eq!(snap.historical_sessions, 1);
    }
}
