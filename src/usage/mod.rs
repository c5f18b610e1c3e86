//! Usage ceiling estimation and burn rate analytics

pub mod models;
pub mod stats;
pub mod plans;
pub mod estimator;
pub mod burnrate;
pub mod session;
pub mod engine;
pub mod accuracy;
pub mod config;
pub mod reader;
pub mod background;
pub mod format;

pub use models::*;
pub use plans::{Category, CategoryProfile, PlanCatalog, PlanTier};
pub use estimator::{accuracy_warning, CeilingEstimator, EstimatorPolicy, PerItemMethod, WeightTable};
pub use burnrate::RateCalculator;
pub use session::{SessionAnalyzer, SESSION_DURATION_MINUTES};
pub use engine::{SessionCeiling, UsageEngine};
pub use accuracy::{analyze_accuracy, per_item_variance, AccuracyAnalysis, PerItemVariance};
pub use config::{Config, ConfigError};
pub use reader::{find_active, CcusageCommand, SourceError, UsageSource};
pub use background::{build_report, start_monitor, MonitorEvent, MonitorReport};
