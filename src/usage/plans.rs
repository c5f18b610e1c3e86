//! Plan tiers and their reference allowances

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::usage::models::UsageInterval;

/// Default per-item consumption when there is no recent history
pub const DEFAULT_PER_ITEM: u64 = 150;

/// Peak session consumption above which "auto" resolves to max20
pub const MAX20_DETECTION_THRESHOLD: u64 = 100_000;
/// Peak session consumption above which "auto" resolves to max5
pub const MAX5_DETECTION_THRESHOLD: u64 = 25_000;

/// Concrete plan tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Pro,
    Max5,
    Max20,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Pro => "pro",
            PlanTier::Max5 => "max5",
            PlanTier::Max20 => "max20",
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested category: either a concrete tier or auto-detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Auto,
    Tier(PlanTier),
}

impl Category {
    /// Parse a category label. Unknown labels fall back to the lowest tier.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "auto" => Category::Auto,
            "max5" => Category::Tier(PlanTier::Max5),
            "max20" => Category::Tier(PlanTier::Max20),
            _ => Category::Tier(PlanTier::Pro),
        }
    }

    /// Map to a concrete tier, detecting "auto" from the largest session seen
    pub fn resolve(&self, intervals: &[UsageInterval]) -> PlanTier {
        match self {
            Category::Tier(tier) => *tier,
            Category::Auto => detect_tier(intervals),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Auto => f.write_str("auto"),
            Category::Tier(tier) => tier.fmt(f),
        }
    }
}

/// Detect the tier from the peak consumption of any real session
pub fn detect_tier(intervals: &[UsageInterval]) -> PlanTier {
    let peak = intervals
        .iter()
        .filter(|i| !i.is_gap)
        .map(|i| i.total_consumed)
        .max()
        .unwrap_or(0);

    if peak > MAX20_DETECTION_THRESHOLD {
        PlanTier::Max20
    } else if peak > MAX5_DETECTION_THRESHOLD {
        PlanTier::Max5
    } else {
        PlanTier::Pro
    }
}

/// Static allowance for one tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryProfile {
    /// Items (messages) allowed per session window
    pub item_allowance: u64,
    /// Fallback consumption per item
    pub default_per_item: u64,
}

impl CategoryProfile {
    pub fn new(item_allowance: u64, default_per_item: u64) -> Self {
        Self {
            item_allowance,
            default_per_item,
        }
    }

    /// Reference ceiling for a given per-item rate
    pub fn reference_ceiling(&self, per_item: u64) -> u64 {
        self.item_allowance.saturating_mul(per_item)
    }
}

/// Catalog of tier profiles, fixed at startup
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    profiles: HashMap<PlanTier, CategoryProfile>,
    default_profile: CategoryProfile,
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanCatalog {
    pub fn new() -> Self {
        let pro = CategoryProfile::new(45, DEFAULT_PER_ITEM);

        let mut profiles = HashMap::new();
        profiles.insert(PlanTier::Pro, pro);
        profiles.insert(PlanTier::Max5, CategoryProfile::new(225, DEFAULT_PER_ITEM));
        profiles.insert(PlanTier::Max20, CategoryProfile::new(900, DEFAULT_PER_ITEM));

        Self {
            profiles,
            default_profile: pro,
        }
    }

    /// Replace the profile of one tier
    pub fn with_profile(mut self, tier: PlanTier, profile: CategoryProfile) -> Self {
        self.profiles.insert(tier, profile);
        if tier == PlanTier::Pro {
            self.default_profile = profile;
        }
        self
    }

    /// Profile for a tier
    pub fn profile(&self, tier: PlanTier) -> &CategoryProfile {
        self.profiles.get(&tier).unwrap_or(&self.default_profile)
    }
}
