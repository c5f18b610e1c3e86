//! Usage data acquisition from the ccusage CLI

use std::process::Command;

use chrono::NaiveDate;
use log::{debug, warn};

use crate::usage::models::{BlocksResponse, DailyResponse, UsageInterval};

/// Error type for data source operations
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("Command `{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Supplier of session history, refreshed once per polling tick
pub trait UsageSource: Send + Sync {
    /// All known intervals, oldest first
    fn fetch_intervals(&self) -> Result<Vec<UsageInterval>, SourceError>;

    /// Total spend for a calendar day, if known. Opaque to the analytics core.
    fn today_cost(&self, _today: NaiveDate) -> Option<f64> {
        None
    }
}

/// Runs `ccusage blocks --json` and `ccusage daily --json`
#[derive(Debug, Clone)]
pub struct CcusageCommand {
    program: String,
}

impl Default for CcusageCommand {
    fn default() -> Self {
        Self::new("ccusage")
    }
}

impl CcusageCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, subcommand: &str) -> Result<Vec<u8>, SourceError> {
        let output = Command::new(&self.program)
            .args([subcommand, "--json"])
            .output()
            .map_err(|source| SourceError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(SourceError::CommandFailed {
                command: format!("{} {} --json", self.program, subcommand),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

impl UsageSource for CcusageCommand {
    fn fetch_intervals(&self) -> Result<Vec<UsageInterval>, SourceError> {
        let stdout = self.run("blocks")?;
        let blocks = parse_blocks(&stdout)?;
        debug!("Fetched {} usage blocks", blocks.len());
        Ok(blocks)
    }

    fn today_cost(&self, today: NaiveDate) -> Option<f64> {
        let stdout = match self.run("daily") {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to fetch daily cost: {}", e);
                return None;
            }
        };

        match parse_daily_cost(&stdout, today) {
            Ok(cost) => cost,
            Err(e) => {
                warn!("Failed to parse daily cost: {}", e);
                None
            }
        }
    }
}

/// Decode a `blocks --json` payload
pub fn parse_blocks(json: &[u8]) -> Result<Vec<UsageInterval>, SourceError> {
    let response: BlocksResponse = serde_json::from_slice(json)?;
    Ok(response.blocks)
}

/// Cost for `today` from a `daily --json` payload
pub fn parse_daily_cost(json: &[u8], today: NaiveDate) -> Result<Option<f64>, SourceError> {
    let response: DailyResponse = serde_json::from_slice(json)?;
    let key = today.format("%Y-%m-%d").to_string();

    Ok(response
        .daily
        .into_iter()
        .find(|day| day.date == key)
        .map(|day| day.total_cost))
}

/// The currently open interval, if any
pub fn find_active(intervals: &[UsageInterval]) -> Option<&UsageInterval> {
    intervals.iter().find(|i| i.is_active)
}
