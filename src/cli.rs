//! Command line arguments for the binaries

use std::path::PathBuf;

use clap::Parser;

use crate::usage::config::{Config, ConfigError, VALID_PLANS};
use crate::usage::estimator::PerItemMethod;

/// Arguments of the `usage-ceiling` monitor
#[derive(Parser, Debug)]
#[command(author, version, about = "Usage ceiling and burn rate monitor")]
pub struct MonitorArgs {
    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Plan tier; overrides the config file
    #[arg(short, long, value_parser = VALID_PLANS)]
    pub plan: Option<String>,

    /// Refresh interval in seconds; overrides the config file
    #[arg(short = 'i', long)]
    pub refresh_interval: Option<u64>,
}

impl MonitorArgs {
    /// Load the config file and apply command line overrides
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(plan) = &self.plan {
            config.plan = plan.clone();
        }
        if let Some(secs) = self.refresh_interval {
            config.refresh_interval_seconds = secs;
        }
        config.validate();

        Ok(config)
    }
}

/// Arguments of the `analyze_accuracy` report
#[derive(Parser, Debug)]
#[command(author, version, about = "Ceiling estimation accuracy report")]
pub struct AccuracyArgs {
    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Saved `ccusage blocks --json` output; runs ccusage when omitted
    #[arg(short, long)]
    pub blocks: Option<PathBuf>,

    /// Per-item summary: median, mode, avg, pNN or trimNN
    #[arg(short, long, default_value = "p40", value_parser = parse_method)]
    pub method: PerItemMethod,

    /// ccusage executable
    #[arg(long, default_value = "ccusage")]
    pub ccusage_command: String,
}

fn parse_method(text: &str) -> Result<PerItemMethod, String> {
    PerItemMethod::try_parse(text)
        .ok_or_else(|| format!("unknown method {:?} (expected median, mode, avg, pNN or trimNN)", text))
}
