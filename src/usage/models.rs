//! Data models for usage ceiling estimation and session analysis

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One bounded or still-open usage session, as reported by the data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageInterval {
    pub start_time: DateTime<Utc>,
    /// Actual end of the last recorded activity. Absent for open sessions.
    #[serde(default, rename = "actualEndTime")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, rename = "totalTokens")]
    pub total_consumed: u64,
    #[serde(default, rename = "entries")]
    pub item_count: u64,
    #[serde(default)]
    pub is_active: bool,
    /// Synthetic placeholder between sessions, never counted
    #[serde(default)]
    pub is_gap: bool,
}

impl UsageInterval {
    /// Create a closed, non-gap interval
    pub fn completed(
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        total_consumed: u64,
        item_count: u64,
    ) -> Self {
        Self {
            start_time,
            end_time: Some(end_time),
            total_consumed,
            item_count,
            is_active: false,
            is_gap: false,
        }
    }

    /// Create the currently open interval
    pub fn active(start_time: DateTime<Utc>, total_consumed: u64, item_count: u64) -> Self {
        Self {
            start_time,
            end_time: None,
            total_consumed,
            item_count,
            is_active: true,
            is_gap: false,
        }
    }

    /// Create a gap placeholder
    pub fn gap(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time: Some(end_time),
            total_consumed: 0,
            item_count: 0,
            is_active: false,
            is_gap: true,
        }
    }

    /// Completed, real session (not a gap and not the open one)
    pub fn is_historical(&self) -> bool {
        !self.is_gap && !self.is_active
    }
}

/// Result of a ceiling estimation pass
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CeilingEstimate {
    pub value: u64,
    /// Number of historical sessions that fed the data-driven estimate
    pub basis_session_count: usize,
    pub per_item_rate: u64,
    /// Concrete tier the reference estimate was taken from
    pub source_category: String,
}

/// Session status, re-evaluated every cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Ok,
    Warning,
    LimitExceeded,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Ok => write!(f, "OK"),
            SessionStatus::Warning => write!(f, "WARNING"),
            SessionStatus::LimitExceeded => write!(f, "LIMIT EXCEEDED"),
        }
    }
}

/// Displayable metrics for the current session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub consumed_so_far: u64,
    pub ceiling: u64,
    pub percent_used: f64,
    /// Negative once the ceiling has been passed
    pub remaining: i64,
    pub elapsed_minutes: f64,
    pub remaining_minutes: f64,
    pub progress_percent: f64,
    pub burn_rate: f64,
    pub session_end_time: DateTime<Utc>,
    pub projected_depletion_time: DateTime<Utc>,
    pub status: SessionStatus,
    /// Completed sessions available in the supplied history
    pub historical_sessions: usize,
}

/// `ccusage blocks --json` response
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BlocksResponse {
    #[serde(default)]
    pub blocks: Vec<UsageInterval>,
}

/// One row of `ccusage daily --json`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCost {
    pub date: String,
    #[serde(default)]
    pub total_cost: f64,
}

/// `ccusage daily --json` response
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DailyResponse {
    #[serde(default)]
    pub daily: Vec<DailyCost>,
}
