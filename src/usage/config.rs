//! Configuration file discovery and loading

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::usage::estimator::EstimatorPolicy;

/// Environment variable that points at an explicit config file
pub const CONFIG_PATH_ENV: &str = "USAGE_CEILING_CONFIG";

const CONFIG_DIR_NAME: &str = "usage-ceiling";
const CONFIG_FILE_NAME: &str = "config.json";
pub const VALID_PLANS: [&str; 4] = ["auto", "pro", "max5", "max20"];

/// Error type for configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No configuration directory available on this platform")]
    NoConfigDir,
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_plan")]
    pub plan: String,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
    /// Authoritative ceiling; when set no estimation is performed
    #[serde(default)]
    pub ceiling_override: Option<u64>,
    #[serde(default = "default_accuracy_warning_percent")]
    pub accuracy_warning_percent: f64,
    /// Re-estimate a pro session with tier detection once it outgrows its ceiling
    #[serde(default = "default_auto_switch")]
    pub auto_switch: bool,
    #[serde(default = "default_ccusage_command")]
    pub ccusage_command: String,
}

fn default_plan() -> String {
    "auto".to_string()
}

fn default_refresh_interval() -> u64 {
    3
}

fn default_accuracy_warning_percent() -> f64 {
    10.0
}

fn default_auto_switch() -> bool {
    true
}

fn default_ccusage_command() -> String {
    "ccusage".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plan: default_plan(),
            refresh_interval_seconds: default_refresh_interval(),
            ceiling_override: None,
            accuracy_warning_percent: default_accuracy_warning_percent(),
            auto_switch: default_auto_switch(),
            ccusage_command: default_ccusage_command(),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// A path given explicitly, either as `custom_path` or through
    /// `USAGE_CEILING_CONFIG`, must exist. A missing file at the platform
    /// default location yields defaults.
    pub fn load(custom_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = custom_path {
            return Self::read(path, true);
        }
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Self::read(Path::new(&path), true);
        }
        match default_config_path() {
            Some(path) => Self::read(&path, false),
            None => Ok(Self::default()),
        }
    }

    fn read(path: &Path, required: bool) -> Result<Self, ConfigError> {
        if !path.exists() {
            if required {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&contents)?;
        config.validate();
        log::info!("Loaded config from {:?} (plan: {})", path, config.plan);
        Ok(config)
    }

    /// Write to `path`, or the default location
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path().ok_or(ConfigError::NoConfigDir)?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    /// Normalize out-of-range values
    pub fn validate(&mut self) {
        let plan = self.plan.trim().to_lowercase();
        if VALID_PLANS.contains(&plan.as_str()) {
            self.plan = plan;
        } else {
            log::warn!("Unknown plan {:?}, falling back to auto", self.plan);
            self.plan = default_plan();
        }

        if self.refresh_interval_seconds == 0 {
            self.refresh_interval_seconds = default_refresh_interval();
        }
    }

    /// Estimator policy derived from this configuration
    pub fn estimator_policy(&self) -> EstimatorPolicy {
        EstimatorPolicy {
            accuracy_warning_percent: self.accuracy_warning_percent,
            ..EstimatorPolicy::default()
        }
    }
}

/// Config file location
/// Priority: 1. USAGE_CEILING_CONFIG env var, 2. platform config dir
pub fn config_path() -> Option<PathBuf> {
    if let Some(env_path) = env::var_os(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(env_path));
    }

    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}
