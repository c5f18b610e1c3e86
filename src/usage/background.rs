//! Background polling loop that feeds the analytics engine

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::usage::config::Config;
use crate::usage::engine::{SessionCeiling, UsageEngine};
use crate::usage::models::{CeilingEstimate, SessionSnapshot, UsageInterval};
use crate::usage::reader::{find_active, UsageSource};

/// Capacity of the event channel
const EVENT_BUFFER: usize = 16;

/// Everything a renderer needs for one cycle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorReport {
    pub generated_at: DateTime<Utc>,
    /// Tier the ceiling was derived from
    pub category: String,
    pub estimate: CeilingEstimate,
    pub auto_switched: bool,
    pub snapshot: SessionSnapshot,
    pub accuracy_warning: Option<String>,
    pub today_cost: Option<f64>,
}

/// Outcome of one polling tick
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    Report(Box<MonitorReport>),
    /// History was fetched but nothing is currently open
    NoActiveSession,
    /// Fetch failed; the next tick retries
    SourceUnavailable(String),
}

/// Calendar day of `now` in `tz`; ccusage keys daily rows by local date
pub fn calendar_day<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    now.with_timezone(tz).date_naive()
}

/// Run one analysis pass over freshly fetched intervals
pub fn build_report(
    engine: &UsageEngine,
    config: &Config,
    intervals: &[UsageInterval],
    today_cost: Option<f64>,
    now: DateTime<Utc>,
) -> MonitorEvent {
    let Some(current) = find_active(intervals) else {
        return MonitorEvent::NoActiveSession;
    };

    let ceiling = match config.ceiling_override {
        Some(value) => SessionCeiling {
            estimate: CeilingEstimate {
                value,
                basis_session_count: 0,
                per_item_rate: 0,
                source_category: engine.resolve_category(&config.plan, intervals).to_string(),
            },
            auto_switched: false,
        },
        None => engine.session_ceiling(&config.plan, current, intervals, config.auto_switch),
    };

    let rate = engine.compute_rate(intervals, now);
    let snapshot = engine.analyze(current, intervals, ceiling.estimate.value, rate, now);
    let accuracy_warning = engine.accuracy_warning(current.total_consumed, ceiling.estimate.value);

    MonitorEvent::Report(Box::new(MonitorReport {
        generated_at: now,
        category: ceiling.estimate.source_category.clone(),
        estimate: ceiling.estimate,
        auto_switched: ceiling.auto_switched,
        snapshot,
        accuracy_warning,
        today_cost,
    }))
}

/// Start polling `source` every `config.refresh_interval_seconds`.
///
/// The task stops once the returned receiver is dropped.
pub fn start_monitor(
    engine: Arc<UsageEngine>,
    source: Arc<dyn UsageSource>,
    config: Config,
) -> (JoinHandle<()>, mpsc::Receiver<MonitorEvent>) {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);

    let handle = tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(config.refresh_interval_seconds.max(1)));

        loop {
            ticker.tick().await;

            let fetch_source = Arc::clone(&source);
            let fetched = tokio::task::spawn_blocking(move || {
                let intervals = fetch_source.fetch_intervals()?;
                let cost = fetch_source.today_cost(calendar_day(Utc::now(), &Local));
                Ok::<_, crate::usage::reader::SourceError>((intervals, cost))
            })
            .await;

            let event = match fetched {
                Ok(Ok((intervals, cost))) => {
                    build_report(&engine, &config, &intervals, cost, Utc::now())
                }
                Ok(Err(e)) => {
                    log::warn!("Failed to fetch usage data: {}", e);
                    MonitorEvent::SourceUnavailable(e.to_string())
                }
                Err(e) => {
                    log::error!("Usage fetch task failed: {}", e);
                    MonitorEvent::SourceUnavailable(e.to_string())
                }
            };

            if tx.send(event).await.is_err() {
                log::debug!("Monitor receiver dropped, stopping");
                break;
            }
        }
    });

    (handle, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::models::SessionStatus;
    use crate::usage::reader::SourceError;
    use chrono::{Duration as ChronoDuration, FixedOffset};
    use std::sync::Mutex;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn intervals(active_total: u64) -> Vec<UsageInterval> {
        let earlier = now() - ChronoDuration::hours(10);
        vec![
            UsageInterval::completed(earlier, earlier + ChronoDuration::hours(2), 6000, 40),
            UsageInterval::active(now() - ChronoDuration::minutes(30), active_total, 10),
        ]
    }

    struct FixedSource(Vec<UsageInterval>);

    impl UsageSource for FixedSource {
        fn fetch_intervals(&self) -> Result<Vec<UsageInterval>, SourceError> {
            Ok(self.0.clone())
        }

        fn today_cost(&self, _today: NaiveDate) -> Option<f64> {
            Some(2.5)
        }
    }

    struct RecordingSource {
        intervals: Vec<UsageInterval>,
        asked: Mutex<Option<NaiveDate>>,
    }

    impl UsageSource for RecordingSource {
        fn fetch_intervals(&self) -> Result<Vec<UsageInterval>, SourceError> {
            Ok(self.intervals.clone())
        }

        fn today_cost(&self, today: NaiveDate) -> Option<f64> {
            *self.asked.lock().unwrap() = Some(today);
            None
        }
    }

    struct BrokenSource;

    impl UsageSource for BrokenSource {
        fn fetch_intervals(&self) -> Result<Vec<UsageInterval>, SourceError> {
            Err(SourceError::CommandFailed {
                command: "ccusage blocks --json".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "boom".to_string(),
            })
        }
    }

    #[test]
    fn test_report_for_active_session() {
        let engine = UsageEngine::default();
        let event = build_report(&engine, &Config::default(), &intervals(1500), Some(1.0), now());

        let MonitorEvent::Report(report) = event else {
            panic!("expected a report");
        };
        assert_eq!(report.category, "pro");
        assert_eq!(report.snapshot.consumed_so_far, 1500);
        // 6000 / 40 = 150 per item
        assert_eq!(report.estimate.value, 6_750);
        assert_eq!(report.today_cost, Some(1.0));
        assert!(report.snapshot.burn_rate > 0.0);
    }

    #[test]
    fn test_no_active_session() {
        let engine = UsageEngine::default();
        let history = &intervals(0)[..1];
        assert!(matches!(
            build_report(&engine, &Config::default(), history, None, now()),
            MonitorEvent::NoActiveSession
        ));
    }

    #[test]
    fn test_ceiling_override_skips_estimation() {
        let engine = UsageEngine::default();
        let config = Config {
            ceiling_override: Some(1_000),
            ..Config::default()
        };

        let MonitorEvent::Report(report) = build_report(&engine, &config, &intervals(1500), None, now())
        else {
            panic!("expected a report");
        };
        assert_eq!(report.estimate.value, 1_000);
        assert_eq!(report.snapshot.status, SessionStatus::LimitExceeded);
        assert!(!report.auto_switched);
    }

    #[tokio::test]
    async fn test_monitor_emits_reports() {
        let source: Arc<dyn UsageSource> = Arc::new(FixedSource(intervals(1500)));
        let (handle, mut rx) = start_monitor(Arc::new(UsageEngine::default()), source, Config::default());

        let event = rx.recv().await.expect("monitor should emit");
        match event {
            MonitorEvent::Report(report) => assert_eq!(report.today_cost, Some(2.5)),
            other => panic!("unexpected event: {:?}", other),
        }

        drop(rx);
        handle.abort();
    }

    #[test]
    fn test_calendar_day_uses_local_date() {
        // 23:00 UTC is already the next morning in Tokyo
        let late = Utc.with_ymd_and_hms(2025, 6, 1, 23, 0, 0).unwrap();
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        assert_eq!(calendar_day(late, &tokyo), NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());

        let new_york = FixedOffset::west_opt(4 * 3600).unwrap();
        let early = Utc.with_ymd_and_hms(2025, 6, 2, 2, 0, 0).unwrap();
        assert_eq!(calendar_day(early, &new_york), NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
    }

    #[tokio::test]
    async fn test_monitor_asks_for_local_day_cost() {
        let source = Arc::new(RecordingSource {
            intervals: intervals(1500),
            asked: Mutex::new(None),
        });
        let dyn_source: Arc<dyn UsageSource> = source.clone();
        let day_before = Local::now().date_naive();
        let (handle, mut rx) = start_monitor(Arc::new(UsageEngine::default()), dyn_source, Config::default());

        rx.recv().await.expect("monitor should emit");
        let asked = source.asked.lock().unwrap().expect("daily cost requested");
        let day_after = Local::now().date_naive();
        assert!(asked == day_before || asked == day_after);

        handle.abort();
    }

    #[tokio::test]
    async fn test_monitor_reports_source_failures() {
        let source: Arc<dyn UsageSource> = Arc::new(BrokenSource);
        let (handle, mut rx) = start_monitor(Arc::new(UsageEngine::default()), source, Config::default());

        match rx.recv().await {
            Some(MonitorEvent::SourceUnavailable(msg)) => assert!(msg.contains("boom")),
            other => panic!("unexpected event: {:?}", other),
        }

        handle.abort();
    }
}
